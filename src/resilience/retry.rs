//! Bounded retries for a single logical operation.
//!
//! # Responsibilities
//! - Attempt an operation up to `max_attempts` times
//! - Classify the most recent error before each retry, never after the last
//! - Abort immediately on non-retryable errors (no wasted attempts on a
//!   deterministic failure)
//! - Sleep an exponential backoff between attempts

use std::future::Future;
use std::time::Duration;

use crate::resilience::backoff::calculate_backoff;

/// Policy for retrying a single operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Ceiling on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl From<&crate::config::schema::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::schema::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Run `op` under `policy`, retrying errors for which `is_retryable`
/// returns true.
///
/// The classification predicate receives the error by reference and must
/// inspect structured error kinds only; retry behavior must not depend on
/// human-readable message text. On exhaustion the last error is returned.
pub async fn run_with_retry<T, E, F, Fut, C>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: C,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= max_attempts || !is_retryable(&error) {
                    return Err(error);
                }

                let delay = calculate_backoff(
                    attempt - 1,
                    policy.base_delay.as_millis() as u64,
                    policy.max_delay.as_millis() as u64,
                );
                tracing::debug!(
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("transient")]
        Transient,
        #[error("fatal")]
        Fatal,
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(40),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            &quick_policy(3),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("done")
                    }
                }
            },
            |e| matches!(e, TestError::Transient),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_aborts_without_waiting() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(10),
        };

        let started = Instant::now();
        let result: Result<(), _> = run_with_retry(
            &policy,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Fatal) }
            },
            |e| matches!(e, TestError::Transient),
        )
        .await;

        assert!(matches!(result, Err(TestError::Fatal)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // A 10s base delay would be visible; an immediate abort is not.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(
            &quick_policy(3),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Transient) }
            },
            |e| matches!(e, TestError::Transient),
        )
        .await;

        assert!(matches!(result, Err(TestError::Transient)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
