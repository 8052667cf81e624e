//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.pullhouse.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PULLHOUSE_*`, with the unprefixed names
//!    used by the scheduled function (`GITHUB_TOKEN`, `SYNAPSE_SERVER`,
//!    `SYNAPSE_DB`, `SYNAPSE_USER`, `SYNAPSE_PASS`, `DAYS_BACK`, `REPOS`)
//!    honoured when the prefixed value is absent
//! 4. **Command-line arguments** – `--repos`, `--days-back`, and friends
//!
//! # Configuration File
//!
//! ```toml
//! repos = "octo/api,octo/web"
//! days_back = 14
//! warehouse_server = "myworkspace.sql.azuresynapse.net"
//! warehouse_database = "analytics"
//! table_name = "github_pull_requests"
//! ```

use std::env;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::github::error::IntakeError;
use crate::github::{DEFAULT_API_BASE, PersonalAccessToken, parse_api_base};
use crate::pipeline::{GitHubSettings, PipelineSettings};
use crate::warehouse::{
    DEFAULT_TABLE_NAME, IdentityEndpoint, SynapseEndpoint, TableName, WarehouseAuth,
    WarehouseDriver, WarehouseEndpoint, WarehouseTarget,
};

/// Default lookback window in days.
pub const DEFAULT_DAYS_BACK: u32 = 30;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Operation mode determined by CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    /// Fetch, normalize and load.
    PipelineRun,
    /// Count rows in the destination table and exit.
    WarehouseCheck,
}

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use pullhouse::PullhouseConfig;
///
/// let config = PullhouseConfig::load().expect("failed to load configuration");
/// let settings = config.into_settings().expect("settings should resolve");
/// assert!(settings.lookback_days > 0);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PULLHOUSE",
    discovery(
        dotfile_name = ".pullhouse.toml",
        config_file_name = "pullhouse.toml",
        app_name = "pullhouse"
    )
)]
pub struct PullhouseConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--github-token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PULLHOUSE_GITHUB_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `github_token = "..."`
    #[ortho_config(cli_short = 't')]
    pub github_token: Option<String>,

    /// GitHub REST API base URL. Defaults to `https://api.github.com`.
    #[ortho_config()]
    pub api_base: Option<String>,

    /// Comma-separated repositories in `owner/name` form.
    ///
    /// Can be provided via:
    /// - CLI: `--repos <LIST>` or `-r <LIST>`
    /// - Environment: `PULLHOUSE_REPOS` or `REPOS` (legacy)
    /// - Config file: `repos = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repos: Option<String>,

    /// Lookback window in days. Defaults to 30.
    ///
    /// Can be provided via:
    /// - CLI: `--days-back <DAYS>` or `-d <DAYS>`
    /// - Environment: `PULLHOUSE_DAYS_BACK` or `DAYS_BACK` (legacy)
    /// - Config file: `days_back = 30`
    #[ortho_config(cli_short = 'd')]
    pub days_back: Option<u32>,

    /// Destination table. Defaults to `github_pull_requests`.
    #[ortho_config()]
    pub table_name: String,

    /// Synapse server, optionally with `,port`.
    ///
    /// Falls back to the legacy `SYNAPSE_SERVER` variable.
    #[ortho_config()]
    pub warehouse_server: Option<String>,

    /// Synapse database, or the `SQLite` file path for the `sqlite` driver.
    ///
    /// Falls back to the legacy `SYNAPSE_DB` variable.
    #[ortho_config()]
    pub warehouse_database: Option<String>,

    /// SQL login. Without both user and password the loader authenticates
    /// with the host's managed identity.
    ///
    /// Falls back to the legacy `SYNAPSE_USER` variable.
    #[ortho_config()]
    pub warehouse_user: Option<String>,

    /// SQL password. Falls back to the legacy `SYNAPSE_PASS` variable.
    #[ortho_config()]
    pub warehouse_password: Option<String>,

    /// Warehouse driver: `synapse` (default) or `sqlite`.
    #[ortho_config()]
    pub warehouse_driver: String,

    /// Log filter used when `RUST_LOG` is unset. Defaults to `info`.
    #[ortho_config()]
    pub log_level: String,

    /// Connects to the warehouse, prints the destination row count, and
    /// exits without calling GitHub.
    ///
    /// Can be provided via:
    /// - CLI: `--check-warehouse` / `-c`
    /// - Config file: `check_warehouse = true`
    ///
    /// Note: `ortho_config` does not load boolean values from the
    /// environment, so there is no environment variable for this flag.
    #[ortho_config(cli_short = 'c')]
    pub check_warehouse: bool,
}

impl Default for PullhouseConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            api_base: None,
            repos: None,
            days_back: None,
            table_name: DEFAULT_TABLE_NAME.to_owned(),
            warehouse_server: None,
            warehouse_database: None,
            warehouse_user: None,
            warehouse_password: None,
            warehouse_driver: WarehouseDriver::Synapse.as_str().to_owned(),
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            check_warehouse: false,
        }
    }
}

fn legacy_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn configured_or_legacy(value: Option<&String>, legacy: &str) -> Option<String> {
    value
        .filter(|configured| !configured.trim().is_empty())
        .cloned()
        .or_else(|| legacy_env(legacy))
}

fn configuration_error(message: impl Into<String>) -> IntakeError {
    IntakeError::Configuration {
        message: message.into(),
    }
}

impl PullhouseConfig {
    /// Determines the operation mode from the `check_warehouse` flag.
    #[must_use]
    pub const fn operation_mode(&self) -> OperationMode {
        if self.check_warehouse {
            OperationMode::WarehouseCheck
        } else {
            OperationMode::PipelineRun
        }
    }

    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, IntakeError> {
        let token = configured_or_legacy(self.github_token.as_ref(), "GITHUB_TOKEN")
            .ok_or(IntakeError::MissingToken)?;
        PersonalAccessToken::new(token)
    }

    /// Splits the configured repository list, falling back to `REPOS`.
    ///
    /// Entries are trimmed and blanks dropped. No repository is assumed when
    /// nothing is configured.
    #[must_use]
    pub fn resolve_repositories(&self) -> Vec<String> {
        configured_or_legacy(self.repos.as_ref(), "REPOS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves the lookback window, falling back to `DAYS_BACK` and then 30.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when `DAYS_BACK` is not a
    /// non-negative integer.
    pub fn resolve_days_back(&self) -> Result<u32, IntakeError> {
        if let Some(days) = self.days_back {
            return Ok(days);
        }
        legacy_env("DAYS_BACK").map_or(Ok(DEFAULT_DAYS_BACK), |raw| {
            raw.trim().parse::<u32>().map_err(|error| {
                configuration_error(format!("DAYS_BACK must be a whole number of days: {error}"))
            })
        })
    }

    /// Builds the warehouse target from the configured driver.
    ///
    /// Synapse needs a server and database; the `sqlite` driver needs the
    /// database path.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] for an unknown driver, an
    /// invalid table name, or missing connection parameters.
    pub fn warehouse_target(&self) -> Result<WarehouseTarget, IntakeError> {
        let driver = self
            .warehouse_driver
            .parse::<WarehouseDriver>()
            .map_err(|error| configuration_error(error.to_string()))?;
        let table =
            TableName::new(&self.table_name).map_err(|error| configuration_error(error.to_string()))?;
        let database = configured_or_legacy(self.warehouse_database.as_ref(), "SYNAPSE_DB");

        let endpoint = match driver {
            WarehouseDriver::Synapse => {
                let server = configured_or_legacy(self.warehouse_server.as_ref(), "SYNAPSE_SERVER");
                let (Some(server_name), Some(database_name)) = (server, database) else {
                    return Err(configuration_error(
                        "SYNAPSE_SERVER and SYNAPSE_DB must be set (or --warehouse-server and \
                         --warehouse-database)",
                    ));
                };
                let auth = WarehouseAuth::from_credentials(
                    configured_or_legacy(self.warehouse_user.as_ref(), "SYNAPSE_USER"),
                    configured_or_legacy(self.warehouse_password.as_ref(), "SYNAPSE_PASS"),
                    IdentityEndpoint::resolve(
                        legacy_env("IDENTITY_ENDPOINT"),
                        legacy_env("IDENTITY_HEADER"),
                    ),
                );
                WarehouseEndpoint::Synapse(SynapseEndpoint::new(server_name, database_name, auth))
            }
            WarehouseDriver::Sqlite => {
                let path = database.ok_or_else(|| {
                    configuration_error(
                        "the sqlite driver needs --warehouse-database set to a file path",
                    )
                })?;
                WarehouseEndpoint::Sqlite { path: path.into() }
            }
        };

        Ok(WarehouseTarget::new(endpoint, table))
    }

    /// Validates the configuration and produces the settings for a run.
    ///
    /// The warehouse is resolved first so that missing connection parameters
    /// abort before anything else is checked.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] for missing or invalid settings.
    pub fn into_settings(&self) -> Result<PipelineSettings, IntakeError> {
        let warehouse = self.warehouse_target()?;
        let token = self.resolve_token()?;
        let api_base = parse_api_base(self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;

        Ok(PipelineSettings {
            github: GitHubSettings { api_base, token },
            repositories: self.resolve_repositories(),
            lookback_days: self.resolve_days_back()?,
            warehouse,
        })
    }
}

#[cfg(test)]
mod tests;
