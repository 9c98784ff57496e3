//! Transport-level retry policy
//!
//! Governs retries of a single HTTP exchange only: connection failures,
//! timeouts and non-200 statuses. Re-authentication after a token-expired
//! business code is a separate, application-level retry.

use std::time::Duration;

/// Bounded retry with linear backoff.
///
/// Attempt `n` that fails is followed by a sleep of `base_delay * n`, so the
/// default policy sleeps 1000ms then 2000ms between its three attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Whether a request error is a connectivity fault worth retrying.
pub fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
