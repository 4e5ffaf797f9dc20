//! Retry with exponential backoff for transient storage failures.
//!
//! Permanent failures (not-found, permission, unsafe reference) are never
//! retried; only [`StorageError::is_transient`] errors consume attempts.

use crate::ports::storage::StorageError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given 1-based failed attempt:
    /// `base * 2^(attempt-1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation = what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient storage failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn two_transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&quick_policy(3), "fetch", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(StorageError::Transient {
                        reference: "clips/a.mp4".to_string(),
                        detail: "connection reset".to_string(),
                    })
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
    async fn budget_exhaustion_returns_last_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&quick_policy(2), "fetch", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::Transient {
                    reference: "clips/a.mp4".to_string(),
                    detail: "timeout".to_string(),
                })
            }
        })
        .await;
        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&quick_policy(5), "fetch", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(StorageError::NotFound {
                    reference: "clips/missing.mp4".to_string(),
                })
            }
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            StorageError::NotFound { .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }
}
