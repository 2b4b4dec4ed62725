//! Exponential retry backoff for queued writes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Multiplier applied after each failed attempt.
    pub factor: u32,
    /// Upper bound on any single delay.
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            cap: Duration::from_secs(60),
        }
    }
}

/// Stateful iterator over backoff delays.
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl RetryBackoff {
    /// Creates a schedule positioned before the first retry.
    #[must_use]
    pub const fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Returns the next delay and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let multiplier = self.policy.factor.saturating_pow(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        self.policy
            .base
            .saturating_mul(multiplier)
            .min(self.policy.cap)
    }

    /// Returns the number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Restarts the schedule after a successful flush.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }
}
