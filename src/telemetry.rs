//! Run telemetry events and sinks.
//!
//! A pipeline run is unattended, so besides log lines it emits a small set of
//! structured events describing what each repository produced and how the
//! warehouse load ended. The binary writes them to stderr as JSON lines.

use std::io;

use serde::{Deserialize, Serialize};

/// A structured telemetry event emitted by a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// One repository was fetched and normalized.
    RepositoryFetched {
        /// `owner/name` of the repository.
        repository: String,
        /// Raw records returned by the API.
        fetched: u64,
        /// Rows left after normalization.
        normalized: u64,
    },
    /// The warehouse load finished.
    LoadCompleted {
        /// Destination table.
        table: String,
        /// Rows handed to the loader.
        attempted: u64,
        /// Rows inserted.
        inserted: u64,
        /// Rows rejected as duplicate keys.
        duplicates: u64,
        /// Rows that failed for other reasons.
        failed: u64,
    },
    /// The load was not attempted.
    LoadSkipped {
        /// Why the load was skipped.
        reason: String,
    },
    /// The load was aborted before any row was written.
    LoadFailed {
        /// Error detail.
        message: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// In-memory sink for assertions in tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::Mutex;

    use super::{TelemetryEvent, TelemetrySink};

    /// Collects every recorded event.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Drains the recorded events.
        #[must_use]
        pub fn take(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .map(|mut events| events.drain(..).collect())
                .unwrap_or_default()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }
}
