//! Pullhouse CLI entrypoint for the pull request ETL job.

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use pullhouse::{IntakeError, OperationMode, PullhouseConfig, logging};

mod cli;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), IntakeError> {
    let config = load_config()?;
    logging::init(&config.log_level);

    match config.operation_mode() {
        OperationMode::PipelineRun => cli::pipeline_run::run(&config),
        OperationMode::WarehouseCheck => cli::warehouse_check::run(&config),
    }
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PullhouseConfig, IntakeError> {
    PullhouseConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}
