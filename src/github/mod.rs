//! GitHub pull request intake.
//!
//! This module lists pull requests for a repository through the REST API,
//! following pagination and retrying transient failures. Errors are mapped
//! into [`IntakeError`] variants so callers can log precise failures, but a
//! failing repository never aborts a run: the fetcher hands back whatever it
//! collected.

pub mod client;
pub mod error;
pub mod locator;
pub mod rate_limit;
pub mod retry;

pub use client::{PullRequestFetcher, PullRequestsClient};
pub use error::IntakeError;
pub use locator::{
    DEFAULT_API_BASE, PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner,
    parse_api_base,
};
pub use rate_limit::RateLimitInfo;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

#[cfg(test)]
pub use client::MockPullRequestFetcher;
