//! Retry logic with exponential backoff.
//!
//! Only errors the caller classifies as retryable are retried; everything
//! else is returned on the first occurrence.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use engage_common::RetrySettings;

/// Bounded retry with capped exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.initial_backoff,
            max_delay: settings.max_backoff,
            factor: settings.backoff_factor,
        }
    }
}

impl RetryPolicy {
    /// Delay that follows `delay`, saturating at `max_delay`
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.factor)
            .map_or(self.max_delay, |next| next.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        is_retryable: impl Fn(&E) -> bool,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut delay = self.initial_delay.min(self.max_delay);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            attempt, "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Operation failed, retrying"
                    );
                    sleep(delay).await;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(25),
            factor: 2.0,
        }
    }

    fn flaky(err: &TestError) -> bool {
        *err == TestError::Flaky
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<u32, TestError> = policy()
            .run("flaky", flaky, || {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(TestError::Flaky)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_attempts() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), TestError> = policy()
            .run("down", flaky, || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Flaky)
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Flaky));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), TestError> = policy()
            .run("fatal", flaky, || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                }
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_between_attempts() {
        let start = tokio::time::Instant::now();

        let _: Result<(), TestError> = policy()
            .run("down", flaky, || async { Err(TestError::Flaky) })
            .await;

        // 10ms then 20ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(30));
        assert!(elapsed < Duration::from_millis(40));
    }

    #[test]
    fn test_delay_caps_at_max() {
        let policy = policy();
        let second = policy.next_delay(policy.initial_delay);
        assert_eq!(second, Duration::from_millis(20));
        assert_eq!(policy.next_delay(second), Duration::from_millis(25));
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = RetryPolicy::from(&RetrySettings {
            max_attempts: 0,
            ..RetrySettings::default()
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_delay_saturates_on_huge_factor() {
        let policy = RetryPolicy {
            factor: f64::MAX,
            max_delay: Duration::from_secs(1),
            ..policy()
        };
        assert_eq!(policy.next_delay(Duration::from_secs(60)), Duration::from_secs(1));
        assert_eq!(policy.next_delay(Duration::MAX), Duration::from_secs(1));
    }
}
