//! Deadline scheduling policy.

use crate::job::domain::Job;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Instant the grace period is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineAnchor {
    /// Measure from the acceptance timestamp.
    Acceptance,
    /// Measure from the scheduled start of the job window.
    ScheduledStart,
}

/// How long staff have to check in, and from when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Grace period after the anchor.
    pub grace: Duration,
    /// Anchor instant.
    pub anchor: DeadlineAnchor,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10 * 60),
            anchor: DeadlineAnchor::Acceptance,
        }
    }
}

impl EscalationPolicy {
    /// Computes the check-in deadline for an accepted job.
    ///
    /// Returns `None` when the anchor instant is unknown or the deadline is
    /// not representable.
    #[must_use]
    pub fn deadline_for(&self, job: &Job) -> Option<DateTime<Utc>> {
        let anchor = match self.anchor {
            DeadlineAnchor::Acceptance => job.accepted_at()?,
            DeadlineAnchor::ScheduledStart => job.schedule().starts_at(),
        };
        let grace = chrono::Duration::from_std(self.grace).ok()?;
        anchor.checked_add_signed(grace)
    }
}
