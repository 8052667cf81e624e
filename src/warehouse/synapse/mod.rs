//! Synapse dedicated SQL pool session over TDS.
//!
//! The `tiberius` client is asynchronous; the session owns a current-thread
//! Tokio runtime and blocks on each call so the loader stays synchronous.
//! Encryption is always required and the server certificate is validated.

use std::borrow::Cow;

use tiberius::error::Error as TdsError;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::records::ColumnSet;

use super::error::{RowInsertError, WarehouseError};
use super::schema::Dialect;
use super::session::WarehouseSession;
use super::target::{SynapseEndpoint, TableName, WarehouseAuth};
use super::value::{RowValues, SqlValue};

mod identity;

pub use identity::fetch_access_token;

/// SQL Server error numbers for primary key and unique index violations.
const DUPLICATE_KEY_CODES: [u32; 2] = [2627, 2601];
const APPLICATION_NAME: &str = "pullhouse";

type TdsClient = Client<Compat<TcpStream>>;

/// Open Synapse connection.
pub struct SynapseSession {
    runtime: Runtime,
    client: Option<TdsClient>,
}

impl std::fmt::Debug for SynapseSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SynapseSession")
            .field("open", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl SynapseSession {
    /// Connects and authenticates within the endpoint's connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::AuthenticationFailed`] when a managed
    /// identity token cannot be obtained, and
    /// [`WarehouseError::ConnectionFailed`] for network, TLS, login and
    /// timeout failures.
    pub fn connect(endpoint: &SynapseEndpoint) -> Result<Self, WarehouseError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| WarehouseError::ConnectionFailed {
                message: format!("failed to start TDS runtime: {error}"),
            })?;

        let config = Self::build_config(endpoint)?;
        let timeout = endpoint.connect_timeout();
        let client = runtime
            .block_on(async { tokio::time::timeout(timeout, connect_with_redirect(config)).await })
            .map_err(|_elapsed| WarehouseError::ConnectionFailed {
                message: format!("timed out after {}s", timeout.as_secs()),
            })?
            .map_err(|error| WarehouseError::ConnectionFailed {
                message: error.to_string(),
            })?;

        Ok(Self {
            runtime,
            client: Some(client),
        })
    }

    fn build_config(endpoint: &SynapseEndpoint) -> Result<Config, WarehouseError> {
        let (host, port) = endpoint.host_and_port();
        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(endpoint.database());
        config.application_name(APPLICATION_NAME);
        config.encryption(EncryptionLevel::Required);

        let auth = match endpoint.auth() {
            WarehouseAuth::SqlPassword { user, password } => {
                AuthMethod::sql_server(user, password)
            }
            WarehouseAuth::ManagedIdentity(identity) => {
                AuthMethod::aad_token(fetch_access_token(identity)?)
            }
        };
        config.authentication(auth);
        Ok(config)
    }

    fn run_batch(&mut self, sql: &str) -> Result<(), String> {
        let Self { runtime, client } = self;
        let connection = client
            .as_mut()
            .ok_or_else(|| "connection already closed".to_owned())?;
        runtime
            .block_on(async {
                connection.simple_query(sql).await?.into_results().await?;
                Ok::<_, TdsError>(())
            })
            .map_err(|error| error.to_string())
    }
}

async fn connect_with_redirect(config: Config) -> Result<TdsClient, TdsError> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(TdsError::Routing { host, port }) => {
            let mut routed = config;
            routed.host(&host);
            routed.port(port);
            let routed_tcp = TcpStream::connect(routed.get_addr()).await?;
            routed_tcp.set_nodelay(true)?;
            Client::connect(routed, routed_tcp.compat_write()).await
        }
        Err(error) => Err(error),
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            Self::BigInt(number) => ColumnData::I64(*number),
            Self::Text(text) => ColumnData::String(text.as_deref().map(Cow::Borrowed)),
            Self::Bool(flag) => ColumnData::Bit(*flag),
            Self::Float(number) => ColumnData::F64(*number),
            Self::Timestamp(Some(timestamp)) => timestamp.to_sql(),
            Self::Timestamp(None) => ColumnData::DateTime2(None),
        }
    }
}

fn is_duplicate_key(error: &TdsError) -> bool {
    matches!(error, TdsError::Server(token) if DUPLICATE_KEY_CODES.contains(&token.code()))
}

impl WarehouseSession for SynapseSession {
    fn ensure_table(&mut self, table: &TableName) -> Result<(), WarehouseError> {
        self.run_batch(&Dialect::Synapse.create_table_sql(table))
            .map_err(|message| WarehouseError::SchemaFailed { message })
    }

    fn insert_row(
        &mut self,
        table: &TableName,
        columns: &ColumnSet,
        row: &RowValues,
    ) -> Result<(), RowInsertError> {
        let statement = Dialect::Synapse.insert_sql(table, columns);
        let params: Vec<&dyn ToSql> = row
            .values
            .iter()
            .map(|(_, value)| value as &dyn ToSql)
            .collect();

        let Self { runtime, client } = self;
        let Some(connection) = client.as_mut() else {
            return Err(RowInsertError::Rejected {
                message: "connection already closed".to_owned(),
            });
        };

        match runtime.block_on(connection.execute(statement, &params)) {
            Ok(_) => Ok(()),
            Err(error) if is_duplicate_key(&error) => Err(RowInsertError::Duplicate),
            Err(error) => Err(RowInsertError::Rejected {
                message: error.to_string(),
            }),
        }
    }

    fn count_rows(&mut self, table: &TableName) -> Result<u64, WarehouseError> {
        let sql = Dialect::Synapse.count_sql(table);
        let Self { runtime, client } = self;
        let connection = client
            .as_mut()
            .ok_or_else(|| WarehouseError::QueryFailed {
                message: "connection already closed".to_owned(),
            })?;

        let count = runtime
            .block_on(async {
                match connection.simple_query(sql).await?.into_row().await? {
                    Some(row) => row.try_get::<i64, _>(0),
                    None => Ok(None),
                }
            })
            .map_err(|error| WarehouseError::QueryFailed {
                message: error.to_string(),
            })?;

        Ok(count.and_then(|value| u64::try_from(value).ok()).unwrap_or(0))
    }

    fn close(&mut self) -> Result<(), WarehouseError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        self.runtime
            .block_on(client.close())
            .map_err(|error| WarehouseError::ConnectionFailed {
                message: format!("failed to close connection: {error}"),
            })
    }
}

impl Drop for SynapseSession {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::debug!("{error}");
        }
    }
}
