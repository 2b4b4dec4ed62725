//! Persisted escalation deadline.

use crate::job::domain::{JobId, StaffId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deadline row stored in the `pending_deadlines` table, keyed by job id.
///
/// Deadlines are data rather than timer objects so they survive process
/// suspension and can be re-armed on resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeadline {
    /// Job awaiting check-in.
    pub job_id: JobId,
    /// Staff member expected to check in.
    pub staff_id: StaffId,
    /// Instant after which the alert fires.
    pub deadline: DateTime<Utc>,
    /// When the deadline was scheduled.
    pub armed_at: DateTime<Utc>,
}

impl PendingDeadline {
    /// Returns whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.deadline <= now
    }
}
