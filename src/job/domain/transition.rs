//! Pure transition function for the job state machine.

use super::{ChecklistItemId, CompletionPayload, Job, JobDomainError, JobStatus, StaffId};
use chrono::{DateTime, Utc};

/// Input to the job state machine.
///
/// Each event carries the instant it happened so that applying it needs no
/// clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// External assignment to a staff member (`pending → assigned`).
    Assign {
        /// Assignee.
        staff_id: StaffId,
        /// Assignment time.
        at: DateTime<Utc>,
    },
    /// Staff accepts the job (`assigned → accepted`).
    Accept {
        /// Acting staff member.
        staff_id: StaffId,
        /// Acceptance time.
        at: DateTime<Utc>,
    },
    /// Staff declines the job (`assigned|accepted → rejected`).
    Reject {
        /// Acting staff member.
        staff_id: StaffId,
        /// Reason given.
        reason: String,
        /// Rejection time.
        at: DateTime<Utc>,
    },
    /// Staff starts work on site (`accepted → in_progress`).
    Start {
        /// Acting staff member.
        staff_id: StaffId,
        /// Whether check-in failed to capture a position.
        location_unavailable: bool,
        /// Start time.
        at: DateTime<Utc>,
    },
    /// Staff toggles one checklist item while in progress.
    ToggleChecklistItem {
        /// Acting staff member.
        staff_id: StaffId,
        /// Item to toggle.
        item_id: ChecklistItemId,
        /// New `done` value.
        done: bool,
        /// Toggle time.
        at: DateTime<Utc>,
    },
    /// Tracking detected arrival on site; a milestone, not a status change.
    RecordArrival {
        /// Arrival time.
        at: DateTime<Utc>,
    },
    /// Staff completes the job (`in_progress → completed`).
    Complete {
        /// Acting staff member.
        staff_id: StaffId,
        /// Completion data.
        payload: CompletionPayload,
        /// Completion time.
        at: DateTime<Utc>,
    },
    /// The job is withdrawn (`non-terminal → cancelled`).
    Cancel {
        /// Reason given.
        reason: String,
        /// Cancellation time.
        at: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Returns the event name used in errors and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Accept { .. } => "accept",
            Self::Reject { .. } => "reject",
            Self::Start { .. } => "start",
            Self::ToggleChecklistItem { .. } => "toggle checklist item",
            Self::RecordArrival { .. } => "record arrival",
            Self::Complete { .. } => "complete",
            Self::Cancel { .. } => "cancel",
        }
    }
}

/// Applies `event` to `job`, returning the updated job.
///
/// The input is left untouched, so a rejected event has no effect.
///
/// # Errors
///
/// Returns [`JobDomainError::InvalidTransition`] when the event is not
/// permitted from the current status, [`JobDomainError::NotAssignedToStaff`]
/// when the acting staff member is not the assignee,
/// [`JobDomainError::UnknownChecklistItem`] for unknown checklist references
/// and [`JobDomainError::IncompleteRequirements`] when completion finds open
/// required items.
pub fn apply_transition(job: &Job, event: &JobEvent) -> Result<Job, JobDomainError> {
    let mut next = job.clone();
    match event {
        JobEvent::Assign { staff_id, at } => {
            ensure_transition(job, JobStatus::Assigned, event)?;
            next.record_assignment(staff_id.clone(), *at);
            next.set_status(JobStatus::Assigned, *at);
        }
        JobEvent::Accept { staff_id, at } => {
            ensure_transition(job, JobStatus::Accepted, event)?;
            ensure_assignee(job, staff_id)?;
            next.record_acceptance(*at);
            next.set_status(JobStatus::Accepted, *at);
        }
        JobEvent::Reject {
            staff_id,
            reason,
            at,
        } => {
            ensure_transition(job, JobStatus::Rejected, event)?;
            ensure_assignee(job, staff_id)?;
            next.record_closure(*at, reason.clone());
            next.set_status(JobStatus::Rejected, *at);
        }
        JobEvent::Start {
            staff_id,
            location_unavailable,
            at,
        } => {
            ensure_transition(job, JobStatus::InProgress, event)?;
            ensure_assignee(job, staff_id)?;
            next.record_start(*at, *location_unavailable);
            next.set_status(JobStatus::InProgress, *at);
        }
        JobEvent::ToggleChecklistItem {
            staff_id,
            item_id,
            done,
            at,
        } => {
            ensure_status(job, JobStatus::InProgress, event)?;
            ensure_assignee(job, staff_id)?;
            next.checklist_item_mut(item_id)?.set_done(*done);
            next.touch(*at);
        }
        JobEvent::RecordArrival { at } => {
            ensure_status(job, JobStatus::InProgress, event)?;
            next.record_arrival(*at);
        }
        JobEvent::Complete {
            staff_id,
            payload,
            at,
        } => {
            ensure_transition(job, JobStatus::Completed, event)?;
            ensure_assignee(job, staff_id)?;
            for item_id in &payload.completed_items {
                next.checklist_item_mut(item_id)?.set_done(true);
            }
            let missing = next.missing_requirements();
            if !missing.is_empty() {
                return Err(JobDomainError::IncompleteRequirements {
                    job_id: job.id().clone(),
                    missing,
                });
            }
            next.record_completion(*at, payload.notes.clone(), payload.photo_urls.clone());
            next.set_status(JobStatus::Completed, *at);
        }
        JobEvent::Cancel { reason, at } => {
            ensure_transition(job, JobStatus::Cancelled, event)?;
            next.record_closure(*at, reason.clone());
            next.set_status(JobStatus::Cancelled, *at);
        }
    }
    Ok(next)
}

fn ensure_transition(job: &Job, target: JobStatus, event: &JobEvent) -> Result<(), JobDomainError> {
    if job.status().can_transition_to(target) {
        Ok(())
    } else {
        Err(invalid(job, event))
    }
}

fn ensure_status(job: &Job, expected: JobStatus, event: &JobEvent) -> Result<(), JobDomainError> {
    if job.status() == expected {
        Ok(())
    } else {
        Err(invalid(job, event))
    }
}

fn ensure_assignee(job: &Job, staff_id: &StaffId) -> Result<(), JobDomainError> {
    if job.assigned_staff_id() == Some(staff_id) {
        Ok(())
    } else {
        Err(JobDomainError::NotAssignedToStaff {
            job_id: job.id().clone(),
            staff_id: staff_id.clone(),
        })
    }
}

fn invalid(job: &Job, event: &JobEvent) -> JobDomainError {
    JobDomainError::InvalidTransition {
        job_id: job.id().clone(),
        from: job.status(),
        event: event.name(),
    }
}
