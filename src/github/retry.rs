//! Retry policy for the pull request listing endpoint.
//!
//! Transient HTTP statuses are retried with exponential backoff against a
//! small budget. A server `Retry-After` replaces the computed backoff but is
//! capped at one minute. Response bodies cut off in transit are treated
//! separately: the same page is requested again after a fixed pause, and
//! those attempts never count against the budget.

use std::time::Duration;

use reqwest::StatusCode;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_FACTOR: Duration = Duration::from_secs(1);
const DEFAULT_TRUNCATION_PAUSE: Duration = Duration::from_secs(2);
const RETRY_AFTER_CEILING: Duration = Duration::from_secs(60);

/// Blocking pause used between attempts.
pub trait Sleeper: Send + Sync {
    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Backoff and budget settings for page requests.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use pullhouse::github::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
/// assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_factor: Duration,
    truncation_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            truncation_pause: DEFAULT_TRUNCATION_PAUSE,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit values.
    #[must_use]
    pub const fn new(max_retries: u32, backoff_factor: Duration, truncation_pause: Duration) -> Self {
        Self {
            max_retries,
            backoff_factor,
            truncation_pause,
        }
    }

    /// Number of retries allowed after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fixed pause before re-requesting a page whose body was truncated.
    #[must_use]
    pub const fn truncation_pause(&self) -> Duration {
        self.truncation_pause
    }

    /// Delay before retry number `attempt` (1-based): `factor * 2^(attempt-1)`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let multiplier = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_factor.saturating_mul(multiplier)
    }

    /// Delay before retry number `attempt`, preferring the server's
    /// `Retry-After` value capped at one minute.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.map_or_else(
            || self.backoff_for(attempt),
            |requested| requested.min(RETRY_AFTER_CEILING),
        )
    }

    /// Whether `status` is worth retrying.
    #[must_use]
    pub const fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }
}

/// Sleeper that records requested pauses instead of blocking.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::Sleeper;

    /// Records every requested pause and returns immediately.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSleeper {
        pauses: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        /// Returns the pauses requested so far.
        #[must_use]
        pub fn pauses(&self) -> Vec<Duration> {
            self.pauses
                .lock()
                .map(|pauses| pauses.clone())
                .unwrap_or_default()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            if let Ok(mut pauses) = self.pauses.lock() {
                pauses.push(duration);
            }
        }
    }
}
