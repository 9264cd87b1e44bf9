//! Retry engine with exponential backoff
//!
//! Wraps an attempt closure and re-runs it for retryable failures
//! (throttling and transient availability). A policy with
//! `max_retries = 3` makes at most four attempts in total. When the
//! server sends a `Retry-After` hint it takes precedence over the
//! computed backoff; either way the wait is capped at `max_delay_ms`.

use std::future::Future;
use std::time::Duration;

use siteqa_domain::{ApiError, RetryPolicy};

/// Delay before retry number `attempt` (zero-based: the delay after the
/// first failed attempt uses `attempt = 0`).
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    let delay_ms = match retry_after_secs {
        Some(secs) => secs.saturating_mul(1000),
        None => {
            let backoff =
                policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(attempt as i32);
            backoff.min(u64::MAX as f64) as u64
        }
    };
    Duration::from_millis(delay_ms.min(policy.max_delay_ms))
}

/// Run `attempt_fn` until it succeeds, fails non-retryably, or the
/// policy's retry budget is exhausted. The last error is returned as-is.
pub async fn execute<T, F, Fut>(policy: &RetryPolicy, mut attempt_fn: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= policy.max_retries {
                    return Err(err);
                }
                let delay = backoff_delay(policy, attempt, err.retry_after_secs);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    status = err.http_status,
                    code = %err.provider_code,
                    "Retrying SharePoint request after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, initial_delay_ms: 1, max_delay_ms: 5, backoff_multiplier: 2.0 }
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, None), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&policy, 1, None), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&policy, 2, None), Duration::from_millis(4000));
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 10, None), Duration::from_millis(10_000));
    }

    #[test]
    fn retry_after_overrides_backoff_even_when_shorter() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 3, Some(1)), Duration::from_millis(1000));
    }

    #[test]
    fn retry_after_is_still_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(backoff_delay(&policy, 0, Some(3600)), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn success_on_first_attempt_makes_one_call() {
        let calls = AtomicUsize::new(0);
        let result = execute(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ApiError>(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_failures_exhaust_the_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = execute(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::new("Throttled", 429, "HTTP_429", true, None)) }
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.http_status, 429);
        // max_retries = 3 means four attempts in total.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = execute(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::new("Not found", 404, "HTTP_404", false, None)) }
        })
        .await;
        assert_eq!(result.unwrap_err().http_status, 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicUsize::new(0);
        let result = execute(&fast_policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ApiError::new("down", 503, "HTTP_503", true, None))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_a_single_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = execute(&fast_policy(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::new("Throttled", 429, "HTTP_429", true, None)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
