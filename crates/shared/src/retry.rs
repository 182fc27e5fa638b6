//! Generic retry helper with exponential backoff.
//!
//! Not used by the pool scheduler core itself (the core never retries
//! internally; see the error handling design notes), but kept here as the
//! ambient helper a caller wrapping the facade can reach for.

use crate::errors::ErrorEnvelope;
use std::future::Future;
use std::time::Duration;

/// Backoff policy for [`retry_async`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A conservative default: 3 attempts, 100ms initial delay, doubling, capped at 2s.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(2),
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.backoff_factor.powi(attempt as i32);
        let millis = (self.initial_delay.as_millis() as f64) * scaled;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry an async operation under a [`RetryPolicy`], retrying only errors classified
/// as retriable.
pub async fn retry_async<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, ErrorEnvelope>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ErrorEnvelope>>,
{
    retry_async_with_observer(policy, &mut operation, |_, _| {}).await
}

/// As [`retry_async`], but invokes `on_retry(attempt, &error)` before each sleep.
pub async fn retry_async_with_observer<T, F, Fut, O>(
    policy: RetryPolicy,
    operation: &mut F,
    mut on_retry: O,
) -> Result<T, ErrorEnvelope>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ErrorEnvelope>>,
    O: FnMut(u32, &ErrorEnvelope),
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let exhausted = attempt + 1 >= policy.max_attempts;
                if exhausted || !error.class.is_retriable() {
                    return Err(error);
                }
                on_retry(attempt, &error);
                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                attempt += 1;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorClass, ErrorCode};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_retriable_errors_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        };

        let result = retry_async(policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ErrorEnvelope::unexpected(
                    ErrorCode::timeout(),
                    "transient",
                    ErrorClass::Retriable,
                ))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retriable_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5);

        let result: Result<(), ErrorEnvelope> = retry_async(policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(5),
        };

        let result: Result<(), ErrorEnvelope> = retry_async(policy, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ErrorEnvelope::unexpected(
                ErrorCode::timeout(),
                "still failing",
                ErrorClass::Retriable,
            ))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
