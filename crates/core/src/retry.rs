//! Bounded retry with exponential backoff for transient network failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::metrics::RETRIES;

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// How a response status should be treated by callers that retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 5xx: worth another attempt.
    Transient,
    /// Anything else, including every 4xx.
    Permanent,
}

/// Classify an HTTP status code.
pub fn classify_status(status: reqwest::StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status.is_server_error() {
        StatusClass::Transient
    } else {
        StatusClass::Permanent
    }
}

/// Retry bound and backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (0-based), doubling each time and capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(16));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the bound is hit.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0;
        loop {
            match attempt(retry + 1).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    let delay = self.backoff_for(retry);
                    warn!(
                        operation,
                        attempt = retry + 1,
                        max_attempts = self.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Transient failure, retrying: {}",
                        e
                    );
                    RETRIES.with_label_values(&[operation]).inc();
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(5))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_classify_status() {
        use reqwest::StatusCode;
        assert_eq!(classify_status(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), StatusClass::Transient);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusClass::Permanent);
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), StatusClass::Permanent);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, TestError> = fast_policy(4)
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 4 {
                        Err(TestError { transient: true })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast_policy(2)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { transient: true }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast_policy(4)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { transient: false }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
