//! Centralized retry-with-backoff for network operations.
//!
//! Every component that retries does so through [`retry_async`] with a
//! [`RetryPolicy`], instead of growing its own attempt loop. The delay
//! between attempts follows:
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! A predicate decides which errors are worth retrying; anything else is
//! returned to the caller immediately (e.g. an HTTP 4xx from the channel
//! should fall through the fidelity ladder, not burn attempts).

use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::warn;

/// Attempt budget and delay shape for one retried operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Initial delay; doubles with each subsequent attempt.
    pub base_delay: Duration,
    /// Cap on the computed delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Run `op` until it succeeds, the attempt budget is exhausted, or it
/// fails with an error `retryable` rejects.
pub async fn retry_async<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut op: F,
    mut retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: FnMut(&E) -> bool,
{
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_attempts || !retryable(&e) {
                    return Err(e);
                }

                let mut delay = policy
                    .base_delay
                    .saturating_mul(1u32 << (attempt - 1).min(20));
                if delay > policy.max_delay {
                    delay = policy.max_delay;
                }
                let jitter_ms: u64 = rand::rng().random_range(0..=250);
                let delay = delay + Duration::from_millis(jitter_ms);

                warn!(
                    attempt,
                    max = policy.max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    ?delay,
                    error = %e,
                    "attempt failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tiny_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, String> = retry_async(
            tiny_policy(5),
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempt_budget_is_bounded() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry_async(
            tiny_policy(3),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("always".to_string()) }
            },
            |_| true,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), String> = retry_async(
            tiny_policy(5),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent".to_string()) }
            },
            |e| e != "permanent",
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
