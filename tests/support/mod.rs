//! Shared test utilities.

use std::path::PathBuf;

use pullhouse::WarehouseTarget;
use pullhouse::warehouse::TableName;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub mod runtime;

/// Destination table used throughout the integration tests.
pub const TABLE: &str = "github_pull_requests";

/// Creates a temporary directory for warehouse tests.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|error| panic!("failed to create temporary directory: {error}"))
}

/// Path of the `SQLite` warehouse file inside `temp_dir`.
pub fn warehouse_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("warehouse.sqlite")
}

/// `SQLite` target for the shared table inside `temp_dir`.
///
/// # Panics
///
/// Panics if the table name constant is invalid.
pub fn sqlite_target(temp_dir: &TempDir) -> WarehouseTarget {
    let table =
        TableName::new(TABLE).unwrap_or_else(|error| panic!("invalid table name: {error}"));
    WarehouseTarget::sqlite(warehouse_path(temp_dir), table)
}

/// A raw pull request as the listing endpoint returns it.
pub fn pull_request_json(repository: &str, id: i64) -> Value {
    json!({
        "id": id,
        "number": id,
        "title": format!("Change {id}"),
        "state": "closed",
        "locked": false,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-04T00:00:00Z",
        "closed_at": "2024-01-03T00:00:00Z",
        "merged_at": "2024-01-03T00:00:00Z",
        "html_url": format!("https://github.com/{repository}/pull/{id}"),
        "user": { "login": "octocat" }
    })
}

/// Serves `ids` as the only page of pull requests for `repository`.
pub fn mount_pull_requests(runtime: &Runtime, server: &MockServer, repository: &str, ids: &[i64]) {
    let listing = format!("/repos/{repository}/pulls");
    let records: Vec<Value> = ids
        .iter()
        .map(|id| pull_request_json(repository, *id))
        .collect();

    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(listing.clone()))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(records))
            .mount(server),
    );
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(listing))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(server),
    );
}
