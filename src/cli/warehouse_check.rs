//! Warehouse connectivity check.

use std::io::{self, Write};

use pullhouse::{IntakeError, PullhouseConfig, WarehouseLoader, WarehouseTarget};

use super::output::write_row_count_to;

/// Connects to the configured warehouse and prints the destination row count.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when the warehouse settings are
/// incomplete, or [`IntakeError::Warehouse`] when the count fails.
pub fn run(config: &PullhouseConfig) -> Result<(), IntakeError> {
    let target = config.warehouse_target()?;
    let mut stdout = io::stdout().lock();
    check(&WarehouseLoader::default(), &target, &mut stdout)
}

/// Counts rows in `target` through `loader` and writes the result.
///
/// # Errors
///
/// Returns [`IntakeError::Warehouse`] when the driver is missing, the
/// connection fails, or the table cannot be counted.
pub fn check<W: Write>(
    loader: &WarehouseLoader,
    target: &WarehouseTarget,
    writer: &mut W,
) -> Result<(), IntakeError> {
    let count = loader.count_rows(target).map_err(|error| {
        tracing::error!("warehouse check failed: {error}");
        IntakeError::Warehouse {
            message: error.to_string(),
        }
    })?;
    write_row_count_to(writer, count, target.table())
}
