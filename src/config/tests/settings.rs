//! Tests for warehouse target and run settings validation.

use std::path::PathBuf;

use rstest::rstest;

use super::helpers::legacy_environment;
use crate::PullhouseConfig;
use crate::github::error::IntakeError;
use crate::warehouse::{WarehouseAuth, WarehouseDriver, WarehouseEndpoint};

fn synapse_config() -> PullhouseConfig {
    PullhouseConfig {
        github_token: Some("ghp_example".to_owned()),
        repos: Some("octo/api".to_owned()),
        warehouse_server: Some("workspace.sql.azuresynapse.net".to_owned()),
        warehouse_database: Some("analytics".to_owned()),
        ..Default::default()
    }
}

#[rstest]
fn synapse_target_uses_sql_login_when_both_credentials_are_set() {
    let _guard = env_lock::lock_env(legacy_environment(&[
        ("SYNAPSE_USER", "loader"),
        ("SYNAPSE_PASS", "secret"),
    ]));

    let target = synapse_config()
        .warehouse_target()
        .expect("target should resolve");

    let WarehouseEndpoint::Synapse(endpoint) = target.endpoint() else {
        panic!("expected a Synapse endpoint, got {target:?}");
    };
    assert_eq!(endpoint.server(), "workspace.sql.azuresynapse.net");
    assert_eq!(endpoint.database(), "analytics");
    assert_eq!(
        endpoint.auth(),
        &WarehouseAuth::SqlPassword {
            user: "loader".to_owned(),
            password: "secret".to_owned(),
        }
    );
    assert_eq!(target.table().as_str(), "github_pull_requests");
}

#[rstest]
fn synapse_target_uses_hosted_identity_without_password() {
    let _guard = env_lock::lock_env(legacy_environment(&[
        ("SYNAPSE_USER", "loader"),
        ("IDENTITY_ENDPOINT", "http://localhost:8081/msi/token"),
        ("IDENTITY_HEADER", "identity-secret"),
    ]));

    let target = synapse_config()
        .warehouse_target()
        .expect("target should resolve");

    let WarehouseEndpoint::Synapse(endpoint) = target.endpoint() else {
        panic!("expected a Synapse endpoint, got {target:?}");
    };
    let WarehouseAuth::ManagedIdentity(identity) = endpoint.auth() else {
        panic!("expected managed identity, got {:?}", endpoint.auth());
    };
    assert_eq!(identity.url(), "http://localhost:8081/msi/token");
    assert_eq!(identity.header(), Some("identity-secret"));
}

#[rstest]
fn synapse_target_reads_legacy_server_and_database() {
    let _guard = env_lock::lock_env(legacy_environment(&[
        ("SYNAPSE_SERVER", "legacy.sql.azuresynapse.net"),
        ("SYNAPSE_DB", "legacy_db"),
    ]));

    let target = PullhouseConfig::default()
        .warehouse_target()
        .expect("target should resolve");

    let WarehouseEndpoint::Synapse(endpoint) = target.endpoint() else {
        panic!("expected a Synapse endpoint, got {target:?}");
    };
    assert_eq!(endpoint.server(), "legacy.sql.azuresynapse.net");
    assert_eq!(endpoint.database(), "legacy_db");
}

#[rstest]
#[case::no_server(None, Some("analytics"))]
#[case::no_database(Some("workspace.sql.azuresynapse.net"), None)]
#[case::neither(None, None)]
fn synapse_target_requires_server_and_database(
    #[case] server: Option<&str>,
    #[case] database: Option<&str>,
) {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        warehouse_server: server.map(ToOwned::to_owned),
        warehouse_database: database.map(ToOwned::to_owned),
        ..Default::default()
    };

    let result = config.warehouse_target();

    assert!(
        matches!(&result, Err(IntakeError::Configuration { message }) if message.contains("SYNAPSE_SERVER")),
        "expected a configuration error, got {result:?}"
    );
}

#[rstest]
fn sqlite_driver_uses_database_as_path() {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        warehouse_driver: "SQLite".to_owned(),
        warehouse_database: Some("/tmp/warehouse.sqlite".to_owned()),
        table_name: "pull_requests".to_owned(),
        ..Default::default()
    };

    let target = config.warehouse_target().expect("target should resolve");

    assert_eq!(target.driver(), WarehouseDriver::Sqlite);
    assert_eq!(
        target.endpoint(),
        &WarehouseEndpoint::Sqlite {
            path: PathBuf::from("/tmp/warehouse.sqlite"),
        }
    );
    assert_eq!(target.table().as_str(), "pull_requests");
}

#[rstest]
#[case::unknown_driver("oracle", "github_pull_requests")]
#[case::invalid_table("sqlite", "pull requests; drop")]
fn invalid_warehouse_settings_are_configuration_errors(
    #[case] driver: &str,
    #[case] table: &str,
) {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        warehouse_driver: driver.to_owned(),
        warehouse_database: Some("warehouse.sqlite".to_owned()),
        table_name: table.to_owned(),
        ..Default::default()
    };

    let result = config.warehouse_target();

    assert!(
        matches!(result, Err(IntakeError::Configuration { .. })),
        "expected a configuration error, got {result:?}"
    );
}

#[rstest]
fn into_settings_collects_a_complete_run() {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        days_back: Some(14),
        ..synapse_config()
    };

    let settings = config.into_settings().expect("settings should resolve");

    assert_eq!(settings.github.api_base.as_str(), "https://api.github.com/");
    assert_eq!(settings.github.token.value(), "ghp_example");
    assert_eq!(settings.repositories, ["octo/api"]);
    assert_eq!(settings.lookback_days, 14);
}

#[rstest]
fn into_settings_checks_the_warehouse_before_the_token() {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        github_token: None,
        warehouse_server: None,
        ..synapse_config()
    };

    let result = config.into_settings();

    assert!(
        matches!(result, Err(IntakeError::Configuration { .. })),
        "expected the warehouse error first, got {result:?}"
    );
}

#[rstest]
fn into_settings_rejects_invalid_api_base() {
    let _guard = env_lock::lock_env(legacy_environment(&[]));
    let config = PullhouseConfig {
        api_base: Some("not a url".to_owned()),
        ..synapse_config()
    };

    let result = config.into_settings();

    assert!(
        matches!(result, Err(IntakeError::InvalidUrl(_))),
        "expected an invalid URL error, got {result:?}"
    );
}
