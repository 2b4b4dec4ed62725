//! Error types for job validation and transitions.

use super::{ChecklistItemId, JobId, JobStatus, StaffId};
use thiserror::Error;

/// Validation errors raised by the job state machine.
///
/// These are never retried: repeating an invalid operation cannot succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobDomainError {
    /// An identifier was blank.
    #[error("{0} identifier must not be empty")]
    EmptyIdentifier(&'static str),

    /// The job title was blank.
    #[error("job title must not be empty")]
    EmptyTitle,

    /// The scheduled window ends before it starts.
    #[error("job schedule window ends before it starts")]
    InvalidSchedule,

    /// The checklist contains the same item identifier twice.
    #[error("duplicate checklist item {0}")]
    DuplicateChecklistItem(ChecklistItemId),

    /// The event is not permitted from the job's current status.
    #[error("invalid transition for job {job_id}: cannot {event} from {from}")]
    InvalidTransition {
        /// Job identifier.
        job_id: JobId,
        /// Status the job was in.
        from: JobStatus,
        /// Name of the rejected event.
        event: &'static str,
    },

    /// The caller is not the staff member the job is assigned to.
    #[error("job {job_id} is not assigned to staff {staff_id}")]
    NotAssignedToStaff {
        /// Job identifier.
        job_id: JobId,
        /// Staff identifier supplied by the caller.
        staff_id: StaffId,
    },

    /// Required checklist items are not done.
    #[error("job {job_id} has incomplete required items: {missing:?}")]
    IncompleteRequirements {
        /// Job identifier.
        job_id: JobId,
        /// Required items still open, in checklist order.
        missing: Vec<ChecklistItemId>,
    },

    /// The referenced checklist item does not exist on the job.
    #[error("job {job_id} has no checklist item {item_id}")]
    UnknownChecklistItem {
        /// Job identifier.
        job_id: JobId,
        /// Unknown item identifier.
        item_id: ChecklistItemId,
    },

    /// A stored or received record violates the job schema invariants.
    #[error("inconsistent job record {job_id}: {reason}")]
    InconsistentRecord {
        /// Job identifier.
        job_id: JobId,
        /// Violated invariant.
        reason: String,
    },
}

/// Error returned while parsing job statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown job status: {0}")]
pub struct ParseJobStatusError(pub String);
