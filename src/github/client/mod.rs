//! Blocking client for the pull request listing endpoint.
//!
//! Pages are requested sequentially until GitHub returns an empty page.
//! Failures never escape as errors: a repository whose fetch cannot continue
//! yields whatever pages were collected before the failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use url::Url;

use super::error::IntakeError;
use super::locator::{PersonalAccessToken, RepositoryLocator};
use super::rate_limit::{self, RateLimitInfo};
use super::retry::{RetryPolicy, Sleeper, ThreadSleeper};

const PER_PAGE: &str = "100";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Fetches every pull request updated since a lower bound.
#[cfg_attr(test, mockall::automock)]
pub trait PullRequestFetcher: Send + Sync {
    /// Returns raw pull request objects for `locator`, in the order GitHub
    /// served them. Partial results are returned when a page fails.
    fn fetch(&self, locator: &RepositoryLocator, since: Option<DateTime<Utc>>) -> Vec<Value>;
}

/// Result of requesting a single page.
#[derive(Debug)]
enum PageOutcome {
    Records(Vec<Value>),
    Truncated,
    Stop(IntakeError),
}

/// A 200 body as read: complete, or received in full but ending before the
/// JSON does.
#[derive(Debug)]
enum PageBody {
    Complete(PageOutcome),
    Incomplete(serde_json::Error),
}

/// `reqwest`-backed implementation of [`PullRequestFetcher`].
pub struct PullRequestsClient {
    http: Client,
    token: PersonalAccessToken,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for PullRequestsClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PullRequestsClient")
            .field("token", &self.token)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PullRequestsClient {
    /// Builds a client authenticated with `token`, using the default retry
    /// policy and real sleeps.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when the HTTP client cannot be
    /// constructed.
    pub fn new(token: &PersonalAccessToken) -> Result<Self, IntakeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|error| IntakeError::Configuration {
                message: format!("failed to configure GitHub HTTP client: {error}"),
            })?;

        Ok(Self {
            http,
            token: token.clone(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Replaces the retry policy and the sleeper used between attempts.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        self.policy = policy;
        self.sleeper = sleeper;
        self
    }

    fn page_url(
        locator: &RepositoryLocator,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> Result<Url, IntakeError> {
        let mut url = locator.pulls_url()?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("state", "all")
                .append_pair("sort", "updated")
                .append_pair("direction", "desc")
                .append_pair("per_page", PER_PAGE);
            if let Some(bound) = since {
                query.append_pair("since", &bound.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
            query.append_pair("page", &page.to_string());
        }
        Ok(url)
    }

    /// Requests one page, retrying transient statuses, transport errors and
    /// unparseable-at-EOF bodies against the retry budget.
    fn fetch_page(&self, url: &Url) -> PageOutcome {
        let mut retries: u32 = 0;
        loop {
            let sent = self
                .http
                .get(url.clone())
                .bearer_auth(self.token.value())
                .send();

            let delay = match sent {
                Ok(response) if response.status() == StatusCode::OK => match read_page(response) {
                    PageBody::Complete(outcome) => return outcome,
                    PageBody::Incomplete(error) => {
                        if retries >= self.policy.max_retries() {
                            return PageOutcome::Stop(IntakeError::Api {
                                message: format!("incomplete pull request page: {error}"),
                            });
                        }
                        retries = retries.saturating_add(1);
                        self.policy.backoff_for(retries)
                    }
                },
                Ok(response) => {
                    let status = response.status();
                    if !RetryPolicy::is_retryable_status(status)
                        || retries >= self.policy.max_retries()
                    {
                        return PageOutcome::Stop(status_error(response));
                    }
                    retries = retries.saturating_add(1);
                    self.policy
                        .delay_for(retries, rate_limit::retry_after(response.headers()))
                }
                Err(error) => {
                    let transient = error.is_connect() || error.is_timeout();
                    if !transient || retries >= self.policy.max_retries() {
                        return PageOutcome::Stop(IntakeError::Network {
                            message: error.to_string(),
                        });
                    }
                    retries = retries.saturating_add(1);
                    self.policy.backoff_for(retries)
                }
            };

            tracing::warn!(
                "retrying {url} (attempt {retries} of {max}) in {delay:?}",
                max = self.policy.max_retries()
            );
            self.sleeper.sleep(delay);
        }
    }
}

impl PullRequestFetcher for PullRequestsClient {
    fn fetch(&self, locator: &RepositoryLocator, since: Option<DateTime<Utc>>) -> Vec<Value> {
        let repository = locator.full_name();
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let url = match Self::page_url(locator, since, page) {
                Ok(url) => url,
                Err(error) => {
                    tracing::error!("cannot build request for {repository}: {error}");
                    break;
                }
            };

            match self.fetch_page(&url) {
                PageOutcome::Records(batch) if batch.is_empty() => break,
                PageOutcome::Records(batch) => {
                    tracing::debug!("{repository}: page {page} returned {} records", batch.len());
                    records.extend(batch);
                    page = page.saturating_add(1);
                }
                PageOutcome::Truncated => {
                    let pause = self.policy.truncation_pause();
                    tracing::warn!(
                        "{repository}: page {page} response was truncated, retrying in {pause:?}"
                    );
                    self.sleeper.sleep(pause);
                }
                PageOutcome::Stop(error) => {
                    tracing::error!(
                        "{repository}: stopping at page {page} with {} records: {error}",
                        records.len()
                    );
                    break;
                }
            }
        }

        records
    }
}

fn read_page(response: Response) -> PageBody {
    let bytes = match response.bytes() {
        Ok(bytes) => bytes,
        Err(error) if error.is_body() => return PageBody::Complete(PageOutcome::Truncated),
        Err(error) => {
            return PageBody::Complete(PageOutcome::Stop(IntakeError::Network {
                message: error.to_string(),
            }));
        }
    };

    let outcome = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(items)) => PageOutcome::Records(items),
        Ok(other) => PageOutcome::Stop(IntakeError::Api {
            message: format!("expected a JSON array of pull requests, got {}", json_kind(&other)),
        }),
        Err(error) if error.is_eof() => return PageBody::Incomplete(error),
        Err(error) => PageOutcome::Stop(IntakeError::Api {
            message: format!("undecodable pull request page: {error}"),
        }),
    };
    PageBody::Complete(outcome)
}

fn status_error(response: Response) -> IntakeError {
    let status = response.status();
    let limits = RateLimitInfo::from_headers(response.headers());
    let body = response.text().unwrap_or_default();
    let message = extract_github_message(&body).unwrap_or_else(|| "unknown error".to_owned());

    if let Some(info) = limits.filter(RateLimitInfo::is_exhausted) {
        return IntakeError::RateLimitExceeded {
            rate_limit: Some(info),
            message: format!(
                "{status} {message} (resets in {}s)",
                info.seconds_until_reset()
            ),
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return IntakeError::RateLimitExceeded {
            rate_limit: limits,
            message: format!("{status} {message}"),
        };
    }

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return IntakeError::Authentication {
            message: format!("GitHub returned {status} {message}"),
        };
    }

    IntakeError::Api {
        message: format!("listing pull requests failed with status {status}: {message}"),
    }
}

fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
