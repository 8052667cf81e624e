//! Error types for warehouse connections and statements.

use thiserror::Error;

/// Errors returned while connecting to or querying the warehouse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WarehouseError {
    /// The configured driver is not compiled into this build.
    #[error("no {driver} driver is available in this build")]
    DriverUnavailable {
        /// Name of the requested driver.
        driver: String,
    },

    /// The destination table name is not a plain identifier.
    #[error("table name must match [A-Za-z_][A-Za-z0-9_]*: {value:?}")]
    InvalidTableName {
        /// The rejected table name.
        value: String,
    },

    /// The connection could not be established.
    #[error("failed to connect to warehouse: {message}")]
    ConnectionFailed {
        /// Error detail from the driver.
        message: String,
    },

    /// Acquiring credentials for the connection failed.
    #[error("failed to obtain warehouse credentials: {message}")]
    AuthenticationFailed {
        /// Error detail from the identity endpoint.
        message: String,
    },

    /// Creating the destination table failed.
    #[error("failed to ensure warehouse table: {message}")]
    SchemaFailed {
        /// Error detail from the driver.
        message: String,
    },

    /// A read query failed.
    #[error("warehouse query failed: {message}")]
    QueryFailed {
        /// Error detail from the driver.
        message: String,
    },
}

/// Why a single row was not inserted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowInsertError {
    /// The row's key already exists.
    #[error("duplicate key")]
    Duplicate,

    /// Any other statement failure.
    #[error("{message}")]
    Rejected {
        /// Error detail from the driver.
        message: String,
    },
}
