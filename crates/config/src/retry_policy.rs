#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

/// Longest single pause between two transport attempts.
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub total: u32,

    /// Base of the exponential backoff, in milliseconds.
    #[serde_as(as = "serde_with::DurationMilliSeconds")]
    pub backoff_factor: Duration,

    /// HTTP status codes considered transient.
    pub statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: Duration::from_millis(200),
            // timeout, conflict, internal error, bad gateway, unavailable,
            // gateway timeout
            statuses: vec![408, 409, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_transient(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }

    /// Pause before retry number `attempt` (1-based): `factor * 2^(attempt - 1)`,
    /// capped at [`BACKOFF_MAX`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_factor
            .checked_mul(1u32 << exponent)
            .unwrap_or(BACKOFF_MAX)
            .min(BACKOFF_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn default_statuses_are_transient() {
        let policy = RetryPolicy::default();
        for status in [408, 409, 500, 502, 503, 504] {
            assert!(policy.is_transient(status));
        }
        assert!(!policy.is_transient(403));
        assert!(!policy.is_transient(200));
    }

    proptest! {
        #[test]
        fn backoff_is_monotonic_and_capped(factor in 0u64..10_000, attempt in 1u32..64) {
            let policy = RetryPolicy {
                backoff_factor: Duration::from_millis(factor),
                ..Default::default()
            };
            let current = policy.backoff(attempt);
            prop_assert!(current <= BACKOFF_MAX);
            prop_assert!(current <= policy.backoff(attempt + 1));
        }
    }
}
