//! Where the loader writes: endpoint, credentials and destination table.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::driver::WarehouseDriver;
use super::error::WarehouseError;

/// Default destination table.
pub const DEFAULT_TABLE_NAME: &str = "github_pull_requests";

const DEFAULT_TDS_PORT: u16 = 1433;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// A validated SQL identifier used as the destination table.
///
/// # Example
///
/// ```
/// use pullhouse::warehouse::TableName;
///
/// assert!(TableName::new("github_pull_requests").is_ok());
/// assert!(TableName::new("prs; DROP TABLE x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Validates `value` against `[A-Za-z_][A-Za-z0-9_]*`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::InvalidTableName`] for anything else.
    pub fn new(value: &str) -> Result<Self, WarehouseError> {
        let mut chars = value.chars();
        let valid_start = chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
        let valid_rest = chars.all(|next| next.is_ascii_alphanumeric() || next == '_');

        if valid_start && valid_rest {
            Ok(Self(value.to_owned()))
        } else {
            Err(WarehouseError::InvalidTableName {
                value: value.to_owned(),
            })
        }
    }

    /// Borrow the identifier.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Token endpoint for the host's managed identity.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityEndpoint {
    url: String,
    header: Option<String>,
}

impl IdentityEndpoint {
    /// Chooses the App Service style endpoint when both values are set,
    /// otherwise the instance metadata service.
    #[must_use]
    pub fn resolve(identity_endpoint: Option<String>, identity_header: Option<String>) -> Self {
        match (identity_endpoint, identity_header) {
            (Some(url), Some(header)) if !url.trim().is_empty() => Self {
                url,
                header: Some(header),
            },
            _ => Self::instance_metadata(),
        }
    }

    /// The Azure instance metadata service endpoint.
    #[must_use]
    pub fn instance_metadata() -> Self {
        Self {
            url: IMDS_TOKEN_URL.to_owned(),
            header: None,
        }
    }

    /// Token endpoint URL.
    #[must_use]
    pub const fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Secret sent as `X-IDENTITY-HEADER`, absent for the metadata service.
    #[must_use]
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }
}

impl fmt::Debug for IdentityEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IdentityEndpoint")
            .field("url", &self.url)
            .field("header", &self.header.as_ref().map(|_| ".."))
            .finish()
    }
}

/// How the loader authenticates to Synapse.
#[derive(Clone, PartialEq, Eq)]
pub enum WarehouseAuth {
    /// SQL login.
    SqlPassword {
        /// Login name.
        user: String,
        /// Login password.
        password: String,
    },
    /// Access token from the host's managed identity.
    ManagedIdentity(IdentityEndpoint),
}

impl WarehouseAuth {
    /// SQL authentication when both values are present and non-blank,
    /// otherwise managed identity.
    #[must_use]
    pub fn from_credentials(
        user: Option<String>,
        password: Option<String>,
        identity: IdentityEndpoint,
    ) -> Self {
        match (
            user.filter(|value| !value.trim().is_empty()),
            password.filter(|value| !value.is_empty()),
        ) {
            (Some(login), Some(secret)) => Self::SqlPassword {
                user: login,
                password: secret,
            },
            _ => Self::ManagedIdentity(identity),
        }
    }
}

impl fmt::Debug for WarehouseAuth {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SqlPassword { user, .. } => formatter
                .debug_struct("SqlPassword")
                .field("user", user)
                .field("password", &"..")
                .finish(),
            Self::ManagedIdentity(endpoint) => formatter
                .debug_tuple("ManagedIdentity")
                .field(endpoint)
                .finish(),
        }
    }
}

/// Connection details for a Synapse dedicated SQL pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynapseEndpoint {
    server: String,
    database: String,
    auth: WarehouseAuth,
    connect_timeout: Duration,
}

impl SynapseEndpoint {
    /// Creates an endpoint with the default 30 second connect timeout.
    #[must_use]
    pub const fn new(server: String, database: String, auth: WarehouseAuth) -> Self {
        Self {
            server,
            database,
            auth,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Server as configured.
    #[must_use]
    pub const fn server(&self) -> &str {
        self.server.as_str()
    }

    /// Database name.
    #[must_use]
    pub const fn database(&self) -> &str {
        self.database.as_str()
    }

    /// Authentication mode.
    #[must_use]
    pub const fn auth(&self) -> &WarehouseAuth {
        &self.auth
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Splits the server into host and port.
    ///
    /// Accepts `host`, `host,port`, `host:port` and the `tcp:` prefix used in
    /// Azure connection strings. The port defaults to 1433.
    #[must_use]
    pub fn host_and_port(&self) -> (String, u16) {
        let trimmed = self.server.trim();
        let without_scheme = trimmed.strip_prefix("tcp:").unwrap_or(trimmed);

        let split = without_scheme
            .rsplit_once(',')
            .or_else(|| without_scheme.rsplit_once(':'));
        if let Some((host, port)) = split
            && let Ok(parsed) = port.trim().parse::<u16>()
        {
            return (host.trim().to_owned(), parsed);
        }

        (without_scheme.to_owned(), DEFAULT_TDS_PORT)
    }
}

/// Physical location of the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseEndpoint {
    /// Synapse over TDS.
    Synapse(SynapseEndpoint),
    /// `SQLite` database file.
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
    },
}

/// Endpoint plus destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseTarget {
    endpoint: WarehouseEndpoint,
    table: TableName,
}

impl WarehouseTarget {
    /// Creates a target.
    #[must_use]
    pub const fn new(endpoint: WarehouseEndpoint, table: TableName) -> Self {
        Self { endpoint, table }
    }

    /// Creates a `SQLite` target, mostly for local runs and tests.
    #[must_use]
    pub fn sqlite(path: impl AsRef<Path>, table: TableName) -> Self {
        Self::new(
            WarehouseEndpoint::Sqlite {
                path: path.as_ref().to_path_buf(),
            },
            table,
        )
    }

    /// Driver required to reach the endpoint.
    #[must_use]
    pub const fn driver(&self) -> WarehouseDriver {
        match self.endpoint {
            WarehouseEndpoint::Synapse(_) => WarehouseDriver::Synapse,
            WarehouseEndpoint::Sqlite { .. } => WarehouseDriver::Sqlite,
        }
    }

    /// Endpoint details.
    #[must_use]
    pub const fn endpoint(&self) -> &WarehouseEndpoint {
        &self.endpoint
    }

    /// Destination table.
    #[must_use]
    pub const fn table(&self) -> &TableName {
        &self.table
    }
}
