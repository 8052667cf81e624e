//! Error types exposed by the configuration and GitHub intake layers.

use thiserror::Error;

use super::rate_limit::RateLimitInfo;

/// Errors surfaced while resolving configuration or communicating with GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// The authentication token was missing.
    #[error("personal access token is required (use --github-token or GITHUB_TOKEN)")]
    MissingToken,

    /// A configured repository was not in `owner/name` form.
    #[error("repository must be in owner/name form: {value:?}")]
    InvalidRepository {
        /// The offending repository identifier.
        value: String,
    },

    /// The configured API base URL could not be parsed.
    #[error("API base URL is invalid: {0}")]
    InvalidUrl(String),

    /// The authentication token was rejected by GitHub.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// GitHub error message returned with the 401/403 response.
        message: String,
    },

    /// GitHub returned a non-authentication API error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body from GitHub describing the failure.
        message: String,
    },

    /// Networking failed while calling GitHub.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// Rate limit exceeded after the retry budget was spent.
    #[error("GitHub API rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Rate limit info if available from response headers.
        rate_limit: Option<RateLimitInfo>,
        /// Error message from GitHub.
        message: String,
    },

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// Configuration could not be loaded or is incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The warehouse could not be reached or queried.
    #[error("warehouse error: {message}")]
    Warehouse {
        /// Details about the warehouse failure.
        message: String,
    },
}
