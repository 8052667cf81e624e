//! Log subscriber installation for the binary.

use std::io;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to the provided
/// level. Log lines go to stderr so stdout only carries command output. A
/// subscriber that is already installed is left in place.
pub fn init(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
