//! Warehouse loading.
//!
//! The loader probes for a usable driver, creates the destination table when
//! it is absent, and appends rows one at a time, each insert in autocommit.
//! Duplicate keys and other per-row failures are reported per row; connection
//! failures abort the load but are returned as a [`LoadOutcome`] rather than
//! raised.

mod driver;
mod error;
mod loader;
mod schema;
mod session;
mod sqlite;
#[cfg(feature = "synapse")]
mod synapse;
mod target;
mod value;

pub use driver::{CompiledDriverProbe, DriverProbe, StaticDriverProbe, UnknownDriver, WarehouseDriver};
pub use error::{RowInsertError, WarehouseError};
pub use loader::{BatchLoader, LoadOutcome, LoadReport, RowOutcome, RowReport, WarehouseLoader};
pub use schema::Dialect;
pub use session::{DriverConnector, WarehouseConnector, WarehouseSession};
pub use sqlite::SqliteSession;
#[cfg(feature = "synapse")]
pub use synapse::{SynapseSession, fetch_access_token};
pub use target::{
    DEFAULT_TABLE_NAME, IdentityEndpoint, SynapseEndpoint, TableName, WarehouseAuth,
    WarehouseEndpoint, WarehouseTarget,
};
pub use value::{RowValues, SqlValue};

#[cfg(test)]
pub use loader::MockBatchLoader;
