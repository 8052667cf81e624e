//! Default operation: one pipeline run.

use chrono::Utc;
use pullhouse::telemetry::StderrJsonlTelemetrySink;
use pullhouse::{IntakeError, Pipeline, PullRequestsClient, PullhouseConfig, WarehouseLoader};

use super::output::write_run_summary;

/// Runs the pipeline once for every configured repository.
///
/// Load failures are part of a completed run and do not produce an error.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] or [`IntakeError::MissingToken`]
/// when the configuration is incomplete, before any repository is fetched.
pub fn run(config: &PullhouseConfig) -> Result<(), IntakeError> {
    let settings = config.into_settings().inspect_err(|error| {
        tracing::error!("{error}");
    })?;
    if settings.repositories.is_empty() {
        tracing::warn!("no repositories configured; set --repos or REPOS");
    }

    let client = PullRequestsClient::new(&settings.github.token)?;
    let loader = WarehouseLoader::default();
    let telemetry = StderrJsonlTelemetrySink;

    let summary = Pipeline::new(&client, &loader, &telemetry).run(&settings, Utc::now());
    write_run_summary(&summary, settings.warehouse.table())
}
