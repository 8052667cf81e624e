//! Pullhouse library crate: a scheduled pull request ETL job.
//!
//! For each configured repository the job pages through the GitHub REST API
//! pull request listing, normalizes the records into a fixed tabular shape,
//! deduplicates them across repositories, and appends the rows to an Azure
//! Synapse dedicated SQL pool table (or a local `SQLite` file), creating the
//! table when absent.

pub mod config;
pub mod github;
pub mod logging;
pub mod pipeline;
pub mod records;
pub mod telemetry;
pub mod warehouse;

pub use config::{OperationMode, PullhouseConfig};
pub use github::{
    IntakeError, PersonalAccessToken, PullRequestFetcher, PullRequestsClient, RepositoryLocator,
};
pub use pipeline::{GitHubSettings, Pipeline, PipelineSettings, RunSummary};
pub use records::{ColumnSet, NormalizedBatch, PullRequestRecord, normalize};
pub use warehouse::{LoadOutcome, LoadReport, WarehouseLoader, WarehouseTarget};
