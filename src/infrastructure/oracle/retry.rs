//! Retry policy with exponential backoff for oracle requests.
//!
//! Backoff doubles per attempt and is capped: with the defaults,
//! 10s → 20s → 40s → ... → 300s (max).
//!
//! Only transient errors (network, quota, backend 5xx) are retried;
//! authentication and malformed-payload errors fail immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;
use crate::domain::ports::OracleError;

/// Retry policy configuration for handling transient oracle errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    max_retries: u32,
    /// Initial backoff duration in milliseconds.
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Execute an operation with exponential backoff retry logic.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, OracleError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Oracle call succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if self.should_retry(&err, attempt) {
                        let backoff = self.calculate_backoff(attempt);
                        warn!(
                            "Oracle attempt {} failed with transient error: {}. Retrying in {:?}",
                            attempt + 1,
                            err,
                            backoff
                        );
                        sleep(backoff).await;
                        attempt += 1;
                    } else {
                        if attempt >= self.max_retries {
                            warn!("Oracle failed after {} attempts: {}", attempt + 1, err);
                        } else {
                            debug!("Permanent oracle error, not retrying: {}", err);
                        }
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Formula: `min(initial_backoff * 2^attempt, max_backoff)`.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    fn should_retry(&self, error: &OracleError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_transient()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 1000, 60000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(5), Duration::from_millis(32000));
        assert_eq!(policy.calculate_backoff(6), Duration::from_millis(60000));
        assert_eq!(policy.calculate_backoff(7), Duration::from_millis(60000));
    }

    #[test]
    fn transient_errors_are_retried_within_budget() {
        let policy = RetryPolicy::new(3, 100, 1000);

        assert!(policy.should_retry(&OracleError::Network("reset".into()), 0));
        assert!(policy.should_retry(&OracleError::Quota("429".into()), 2));
        assert!(!policy.should_retry(&OracleError::Network("reset".into()), 3));
        assert!(!policy.should_retry(&OracleError::Auth("401".into()), 0));
        assert!(!policy.should_retry(&OracleError::Malformed("bad".into()), 0));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, 10, 50);
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(OracleError::Backend("500".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_fail_immediately() {
        let policy = RetryPolicy::new(3, 10, 50);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(OracleError::Auth("invalid key".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_surfaces_the_error() {
        let policy = RetryPolicy::new(2, 10, 50);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(OracleError::Network("down".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(OracleError::Network(_))));
        // Initial call + 2 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
