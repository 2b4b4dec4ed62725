//! Domain model for field-service jobs.
//!
//! Everything here is free of I/O: transitions take their timestamp from
//! the event so the state machine can be exercised without a clock.

mod checklist;
mod error;
mod ids;
mod job;
mod status;
mod transition;

pub use checklist::{ChecklistItem, CompletionPayload};
pub use error::{JobDomainError, ParseJobStatusError};
pub use ids::{ChecklistItemId, JobId, StaffId};
pub use job::{Job, JobType, NewJob, Priority, ScheduleWindow};
pub use status::JobStatus;
pub use transition::{JobEvent, apply_transition};
