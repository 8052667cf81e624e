//! Schema-ensuring, row-at-a-time batch loader.

use crate::records::NormalizedBatch;

use super::driver::{CompiledDriverProbe, DriverProbe};
use super::error::{RowInsertError, WarehouseError};
use super::session::{DriverConnector, WarehouseConnector, WarehouseSession, driver_label};
use super::target::WarehouseTarget;
use super::value::RowValues;

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row was written.
    Inserted,
    /// The row's key already existed; the row was skipped.
    DuplicateSkipped,
    /// The row failed for another reason; the batch continued.
    Failed(String),
}

/// Outcome for a single row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    /// Row id.
    pub id: i64,
    /// What happened.
    pub outcome: RowOutcome,
}

/// Per-row results of a completed load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    rows: Vec<RowReport>,
}

impl LoadReport {
    /// Number of rows attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.rows.len()
    }

    /// Number of rows inserted.
    #[must_use]
    pub fn inserted(&self) -> usize {
        self.count(|outcome| matches!(outcome, RowOutcome::Inserted))
    }

    /// Number of rows skipped as duplicates.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.count(|outcome| matches!(outcome, RowOutcome::DuplicateSkipped))
    }

    /// Number of rows that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, RowOutcome::Failed(_)))
    }

    /// Every row outcome, in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[RowReport] {
        &self.rows
    }

    fn count(&self, predicate: impl Fn(&RowOutcome) -> bool) -> usize {
        self.rows.iter().filter(|row| predicate(&row.outcome)).count()
    }
}

impl FromIterator<RowReport> for LoadReport {
    fn from_iter<I: IntoIterator<Item = RowReport>>(rows: I) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }
}

/// Result of one load call. Never an error: failures are reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No load was attempted.
    Skipped {
        /// Why the load was skipped.
        reason: String,
    },
    /// The load aborted before any row was attempted.
    Failed(WarehouseError),
    /// Every row was attempted; each outcome is in the report.
    Completed(LoadReport),
}

/// Loads normalized batches into a warehouse.
#[cfg_attr(test, mockall::automock)]
pub trait BatchLoader: Send + Sync {
    /// Ensures the destination table exists, then appends `batch` one row at
    /// a time.
    fn ensure_schema_and_append(
        &self,
        batch: &NormalizedBatch,
        target: &WarehouseTarget,
    ) -> LoadOutcome;
}

/// Loader that probes for a driver and writes through a connector.
pub struct WarehouseLoader {
    probe: Box<dyn DriverProbe>,
    connector: Box<dyn WarehouseConnector>,
}

impl Default for WarehouseLoader {
    fn default() -> Self {
        Self::new(Box::new(CompiledDriverProbe), Box::new(DriverConnector))
    }
}

impl std::fmt::Debug for WarehouseLoader {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WarehouseLoader")
            .field("drivers", &self.probe.available())
            .finish_non_exhaustive()
    }
}

impl WarehouseLoader {
    /// Creates a loader from explicit parts.
    #[must_use]
    pub fn new(probe: Box<dyn DriverProbe>, connector: Box<dyn WarehouseConnector>) -> Self {
        Self { probe, connector }
    }

    /// Counts rows in the target table.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::DriverUnavailable`] when no driver can reach
    /// the target, or the connection or query error.
    pub fn count_rows(&self, target: &WarehouseTarget) -> Result<u64, WarehouseError> {
        self.ensure_driver(target)?;
        let mut session = self.connector.connect(target)?;
        let counted = session.count_rows(target.table());
        close_quietly(session.as_mut());
        counted
    }

    fn ensure_driver(&self, target: &WarehouseTarget) -> Result<(), WarehouseError> {
        let driver = target.driver();
        if self.probe.available().contains(&driver) {
            Ok(())
        } else {
            Err(WarehouseError::DriverUnavailable {
                driver: driver.to_string(),
            })
        }
    }

    fn append_rows(
        session: &mut dyn WarehouseSession,
        batch: &NormalizedBatch,
        target: &WarehouseTarget,
    ) -> Result<LoadReport, WarehouseError> {
        let table = target.table();
        session.ensure_table(table)?;

        let mut report = LoadReport::default();
        for record in batch.rows() {
            let row = RowValues::project(record, batch.columns().iter());
            let outcome = match session.insert_row(table, batch.columns(), &row) {
                Ok(()) => RowOutcome::Inserted,
                Err(RowInsertError::Duplicate) => {
                    tracing::warn!("skipping duplicate pull request id {} in {table}", row.id);
                    RowOutcome::DuplicateSkipped
                }
                Err(RowInsertError::Rejected { message }) => {
                    tracing::error!("failed to insert pull request id {}: {message}", row.id);
                    RowOutcome::Failed(message)
                }
            };
            report.rows.push(RowReport {
                id: row.id,
                outcome,
            });
        }

        Ok(report)
    }
}

impl BatchLoader for WarehouseLoader {
    fn ensure_schema_and_append(
        &self,
        batch: &NormalizedBatch,
        target: &WarehouseTarget,
    ) -> LoadOutcome {
        if let Err(error) = self.ensure_driver(target) {
            tracing::warn!("{error}; skipping warehouse load");
            return LoadOutcome::Skipped {
                reason: error.to_string(),
            };
        }

        let label = driver_label(target);
        let mut session = match self.connector.connect(target) {
            Ok(session) => session,
            Err(error) => {
                tracing::error!("Error connecting to {label}: {error}");
                return LoadOutcome::Failed(error);
            }
        };

        let result = Self::append_rows(session.as_mut(), batch, target);
        close_quietly(session.as_mut());

        match result {
            Ok(report) => {
                tracing::info!(
                    "loaded {inserted} of {attempted} rows into {label} table {table} \
                     ({duplicates} duplicates, {failed} failed)",
                    inserted = report.inserted(),
                    attempted = report.attempted(),
                    duplicates = report.duplicates(),
                    failed = report.failed(),
                    table = target.table(),
                );
                LoadOutcome::Completed(report)
            }
            Err(error) => {
                tracing::error!("{label} load aborted: {error}");
                LoadOutcome::Failed(error)
            }
        }
    }
}

fn close_quietly(session: &mut dyn WarehouseSession) {
    if let Err(error) = session.close() {
        tracing::warn!("{error}");
    }
}

#[cfg(test)]
mod tests;
