//! Connection seams between the loader and concrete drivers.

use crate::records::ColumnSet;

use super::driver::WarehouseDriver;
use super::error::{RowInsertError, WarehouseError};
use super::sqlite::SqliteSession;
use super::target::{TableName, WarehouseEndpoint, WarehouseTarget};
use super::value::RowValues;

/// An open warehouse connection.
///
/// Every statement runs in autocommit. A rejected insert never affects the
/// rows around it.
#[cfg_attr(test, mockall::automock)]
pub trait WarehouseSession {
    /// Creates `table` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::SchemaFailed`] when the statement fails.
    fn ensure_table(&mut self, table: &TableName) -> Result<(), WarehouseError>;

    /// Inserts one row with a parameterized statement.
    ///
    /// # Errors
    ///
    /// Returns [`RowInsertError::Duplicate`] for key conflicts and
    /// [`RowInsertError::Rejected`] for anything else.
    fn insert_row(
        &mut self,
        table: &TableName,
        columns: &ColumnSet,
        row: &RowValues,
    ) -> Result<(), RowInsertError>;

    /// Counts the rows in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::QueryFailed`] when the query fails.
    fn count_rows(&mut self, table: &TableName) -> Result<u64, WarehouseError>;

    /// Releases the connection.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::ConnectionFailed`] when the driver reports a
    /// failure while closing.
    fn close(&mut self) -> Result<(), WarehouseError>;
}

/// Opens sessions for a target.
#[cfg_attr(test, mockall::automock)]
pub trait WarehouseConnector: Send + Sync {
    /// Connects to the target's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] when the endpoint cannot be reached or
    /// credentials are rejected.
    fn connect(&self, target: &WarehouseTarget) -> Result<Box<dyn WarehouseSession>, WarehouseError>;
}

/// Connector dispatching on the target's endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct DriverConnector;

impl WarehouseConnector for DriverConnector {
    fn connect(&self, target: &WarehouseTarget) -> Result<Box<dyn WarehouseSession>, WarehouseError> {
        match target.endpoint() {
            WarehouseEndpoint::Sqlite { path } => {
                Ok(Box::new(SqliteSession::connect(path)?) as Box<dyn WarehouseSession>)
            }
            #[cfg(feature = "synapse")]
            WarehouseEndpoint::Synapse(endpoint) => Ok(Box::new(
                super::synapse::SynapseSession::connect(endpoint)?,
            ) as Box<dyn WarehouseSession>),
            #[cfg(not(feature = "synapse"))]
            WarehouseEndpoint::Synapse(_) => Err(WarehouseError::DriverUnavailable {
                driver: WarehouseDriver::Synapse.to_string(),
            }),
        }
    }
}

/// Name of the driver a session speaks, for log lines.
#[must_use]
pub const fn driver_label(target: &WarehouseTarget) -> &'static str {
    match target.driver() {
        WarehouseDriver::Synapse => "Synapse",
        WarehouseDriver::Sqlite => "SQLite",
    }
}
