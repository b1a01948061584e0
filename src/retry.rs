use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::Error;

/// Exponential backoff for store calls that fail with a transient error.
///
/// Only `StoreUnavailable` is retried. Every other error is surfaced to the
/// caller on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// `min(initial * multiplier^attempt, max) * jitter`, jitter in `[0.5, 1.0]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);

        Duration::from_secs_f64(capped * jitter)
    }
}

pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "store call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_store_unavailable_error() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(attempt, ?delay, "store unavailable, retrying");

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
    use crate::error::{invalid_state_error, store_unavailable_error};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn delay_is_capped() {
        let policy = fast_policy(10);

        for attempt in 0..10 {
            assert!(policy.delay_for_attempt(attempt) <= Duration::from_millis(4));
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let calls = &AtomicU32::new(0);

        let result = retry_with_backoff(&fast_policy(3), move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(store_unavailable_error());
            }
            Ok(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), Error> = retry_with_backoff(&fast_policy(2), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(store_unavailable_error())
        })
        .await;

        assert!(result.unwrap_err().is_store_unavailable_error());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), Error> = retry_with_backoff(&fast_policy(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(invalid_state_error())
        })
        .await;

        assert!(result.unwrap_err().is_invalid_state_error());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
