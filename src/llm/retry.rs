//! Retry with exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use super::LlmError;

/// Exponential-backoff retry policy for LLM calls.
///
/// Retryable failures (per [`LlmError::is_retryable`]) are retried up to
/// `max_attempts` total attempts with delay `factor^attempt`, clamped to
/// `[min_delay, max_delay]`. Fatal failures surface immediately without
/// consuming an attempt; the final attempt's failure surfaces unwrapped.
/// Total time is therefore bounded by `max_attempts × max_delay` plus the
/// calls themselves.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first try.
    pub max_attempts: u32,
    /// Exponential backoff multiplier.
    pub backoff_factor: f64,
    /// Lower clamp on the computed delay.
    pub min_delay: Duration,
    /// Upper clamp on the computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            backoff_factor,
            ..Self::default()
        }
    }

    /// Backoff delay before retry number `attempt` (1-based: the delay
    /// after the first failed attempt is `delay_for(1)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor.powi(attempt as i32);
        let clamped = secs
            .max(self.min_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(clamped)
    }

    /// Run `op`, retrying transient failures per this policy.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying transient provider error"
                    );
                    tokio::time::sleep(delay).await;
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

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_factor: 2.0,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_delay_exponential_and_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        // clamped at max_delay
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
        // clamped at min_delay for a sub-linear factor
        let slow = RetryPolicy {
            backoff_factor: 0.5,
            ..RetryPolicy::default()
        };
        assert_eq!(slow.delay_for(1), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(LlmError::Timeout)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_final_failure_surfaced_unwrapped() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::Network("down".into())) }
            })
            .await;
        assert!(matches!(result.unwrap_err(), LlmError::Network(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LlmError::Authentication("bad key".into())) }
            })
            .await;
        assert!(matches!(result.unwrap_err(), LlmError::Authentication(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(0)
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }
            })
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
