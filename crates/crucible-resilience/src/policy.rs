//! The retry policy (§4.4): how many attempts, and how long to back off
//! between them.
//!
//! The teacher's `nebula-resilience` expresses retry strategies as
//! const-generic types (`exponential_retry::<3>()`) because its policies
//! are fixed at compile time. A manifest's `max_attempts`/timeout are only
//! known at runtime, so `RetryPolicy` here is a plain struct instead.

use std::time::Duration;

/// Exponential backoff with a cap, matching spec.md §4.4's defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: f64,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts = 3, base = 2.0, max_backoff = 60s` (§4.4 defaults).
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            max_attempts: 3,
            base: 2.0,
            max_backoff: Duration::from_secs(60),
        }
    }

    /// The delay before the attempt numbered `attempt` (1-based), per
    /// `min(base ^ attempt, max_backoff)`.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let seconds = self.base.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let capped = seconds.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let policy = RetryPolicy::defaults();
        assert_eq!(policy.max_attempts, 3);
        assert!((policy.base - 2.0).abs() < f64::EPSILON);
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
    }

    #[test]
    fn backoff_grows_exponentially_until_capped() {
        let policy = RetryPolicy::defaults();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(8));
    }

    #[test]
    fn backoff_never_exceeds_max_backoff() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base: 2.0,
            max_backoff: Duration::from_secs(10),
        };
        assert_eq!(policy.backoff_for(10), Duration::from_secs(10));
    }
}
