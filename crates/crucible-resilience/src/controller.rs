//! The retry-with-backoff attempt loop (§4.4 algorithm).

use crate::policy::RetryPolicy;
use crucible_error::Error;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drive `attempt` up to `policy.max_attempts` times, backing off between
/// retryable failures, and returning as soon as an attempt succeeds, fails
/// non-retryably, or the attempt budget is exhausted.
///
/// `attempt` receives the 1-based attempt number and the deadline for that
/// attempt (`min(timeout_ms, remaining_budget)`, §4.4) and returns the
/// executor's result. On success, returns `(value, retry_count)` where
/// `retry_count = attempt - 1` (§4.4: "return with retry_count = attempt −
/// 1"). On failure, returns `(error, retry_count)` with the same
/// `retry_count` convention, so a caller reporting the failed attempt in an
/// execution record knows how many retries actually happened. Retries never
/// reuse attempt state — it is the caller's responsibility to give each
/// invocation a fresh sandbox.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout_ms: u32,
    total_budget_ms: Option<u32>,
    cancellation: &CancellationToken,
    mut attempt: F,
) -> Result<(T, u32), (Error, u32)>
where
    F: FnMut(u32, Duration) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut remaining_budget = total_budget_ms.map(|ms| Duration::from_millis(u64::from(ms)));
    let mut last_err = Error::unknown("retry loop never invoked the executor");

    let mut attempt_no = 0u32;
    while attempt_no < policy.max_attempts {
        attempt_no += 1;

        let deadline = match remaining_budget {
            Some(budget) => Duration::from_millis(u64::from(timeout_ms)).min(budget),
            None => Duration::from_millis(u64::from(timeout_ms)),
        };

        if cancellation.is_cancelled() {
            return Err((Error::cancelled(), attempt_no - 1));
        }

        let started = Instant::now();
        let result = attempt(attempt_no, deadline).await;
        let elapsed = started.elapsed();
        if let Some(budget) = remaining_budget.as_mut() {
            *budget = budget.saturating_sub(elapsed);
        }

        match result {
            Ok(value) => {
                info!(attempt = attempt_no, "attempt succeeded");
                return Ok((value, attempt_no - 1));
            }
            Err(err) if !err.is_retryable() => {
                warn!(attempt = attempt_no, error = %err, "attempt failed non-retryably");
                return Err((err, attempt_no - 1));
            }
            Err(err) => {
                warn!(attempt = attempt_no, error = %err, "attempt failed, may retry");
                last_err = err;
            }
        }

        if attempt_no == policy.max_attempts {
            break;
        }

        let backoff = policy.backoff_for(attempt_no);
        tokio::select! {
            () = tokio::time::sleep(backoff) => {}
            () = cancellation.cancelled() => return Err((Error::cancelled(), attempt_no - 1)),
        }
    }

    Err((last_err, attempt_no - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base: 1.0,
            max_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt_with_zero_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let result = run_with_retry(
            &fast_policy(3),
            1_000,
            None,
            &token,
            |_attempt, _deadline| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(42)
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(result, (42, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_retryable_failures_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let result = run_with_retry(
            &fast_policy(3),
            1_000,
            None,
            &token,
            |_attempt, _deadline| {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(Error::infra("transient"))
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(result, (7, 2));
    }

    #[tokio::test]
    async fn non_retryable_failure_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        let (err, retry_count) = run_with_retry(
            &fast_policy(3),
            1_000,
            None,
            &token,
            |_attempt, _deadline| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(Error::fatal("bad input"))
                }
            },
        )
        .await
        .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(retry_count, 0);
    }

    #[tokio::test]
    async fn exhausting_attempts_returns_the_last_error() {
        let token = CancellationToken::new();
        let (err, retry_count) = run_with_retry(
            &fast_policy(3),
            1_000,
            None,
            &token,
            |attempt, _deadline| async move {
                Err::<u32, _>(Error::infra(format!("attempt {attempt} failed")))
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("attempt 3"));
        assert_eq!(retry_count, 2);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_returns_cancelled() {
        let token = CancellationToken::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            base: 2.0,
            max_backoff: Duration::from_secs(60),
        };
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let (err, _retry_count) = run_with_retry(&policy, 1_000, None, &token, |_attempt, _deadline| async move {
            Err::<u32, _>(Error::infra("transient"))
        })
        .await
        .unwrap_err();
        assert_eq!(err.wire_type(), "cancelled");
    }

    #[tokio::test]
    async fn per_attempt_deadline_is_bounded_by_remaining_budget() {
        let token = CancellationToken::new();
        let mut seen_deadlines = Vec::new();
        let result = run_with_retry(
            &fast_policy(1),
            5_000,
            Some(1_000),
            &token,
            |_attempt, deadline| {
                seen_deadlines.push(deadline);
                async move { Ok::<_, Error>(()) }
            },
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(seen_deadlines[0], Duration::from_millis(1_000));
    }
}
