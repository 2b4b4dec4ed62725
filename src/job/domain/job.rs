//! Job aggregate root.

use super::{ChecklistItem, ChecklistItemId, JobDomainError, JobId, JobStatus, StaffId};
use crate::location::domain::Coordinate;
use crate::sync::domain::{Collection, SyncDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of field work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Cleaning work.
    Cleaning,
    /// Repair and upkeep.
    Maintenance,
    /// Site inspection.
    Inspection,
}

/// Job priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal scheduling.
    Medium,
    /// Should be handled first.
    High,
    /// Must be handled immediately.
    Urgent,
}

/// Scheduled time window for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

impl ScheduleWindow {
    /// Creates a validated window.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InvalidSchedule`] when `ends_at` precedes
    /// `starts_at`.
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<Self, JobDomainError> {
        if ends_at < starts_at {
            return Err(JobDomainError::InvalidSchedule);
        }
        Ok(Self { starts_at, ends_at })
    }

    /// Returns the scheduled start.
    #[must_use]
    pub const fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Returns the scheduled end.
    #[must_use]
    pub const fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }
}

/// Parameter object for creating a job.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    /// Externally issued job identifier.
    pub id: JobId,
    /// Short human-readable title.
    pub title: String,
    /// Kind of work.
    pub job_type: JobType,
    /// Priority.
    pub priority: Priority,
    /// Scheduled window.
    pub schedule: ScheduleWindow,
    /// Site coordinates used for check-in and arrival detection.
    pub target: Coordinate,
    /// Pre-populated checklist, in display order.
    pub checklist: Vec<ChecklistItem>,
}

/// Job aggregate root.
///
/// Mutated only through [`apply_transition`](super::apply_transition);
/// terminal jobs are retained for audit and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    title: String,
    job_type: JobType,
    priority: Priority,
    status: JobStatus,
    schedule: ScheduleWindow,
    target: Coordinate,
    assigned_staff_id: Option<StaffId>,
    checklist: Vec<ChecklistItem>,
    location_unavailable: bool,
    assigned_at: Option<DateTime<Utc>>,
    accepted_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    arrived_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    closure_reason: Option<String>,
    completion_notes: Option<String>,
    photo_urls: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a pending job.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::EmptyTitle`] for a blank title and
    /// [`JobDomainError::DuplicateChecklistItem`] when checklist identifiers
    /// repeat.
    pub fn new(new_job: NewJob, created_at: DateTime<Utc>) -> Result<Self, JobDomainError> {
        let title = new_job.title.trim().to_owned();
        if title.is_empty() {
            return Err(JobDomainError::EmptyTitle);
        }
        ensure_unique_items(&new_job.checklist)?;
        Ok(Self {
            id: new_job.id,
            title,
            job_type: new_job.job_type,
            priority: new_job.priority,
            status: JobStatus::Pending,
            schedule: new_job.schedule,
            target: new_job.target,
            assigned_staff_id: None,
            checklist: new_job.checklist,
            location_unavailable: false,
            assigned_at: None,
            accepted_at: None,
            started_at: None,
            arrived_at: None,
            completed_at: None,
            closed_at: None,
            closure_reason: None,
            completion_notes: None,
            photo_urls: Vec::new(),
            created_at,
            updated_at: created_at,
        })
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the kind of work.
    #[must_use]
    pub const fn job_type(&self) -> JobType {
        self.job_type
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns the scheduled window.
    #[must_use]
    pub const fn schedule(&self) -> ScheduleWindow {
        self.schedule
    }

    /// Returns the site coordinates.
    #[must_use]
    pub const fn target(&self) -> Coordinate {
        self.target
    }

    /// Returns the assigned staff member, if any.
    #[must_use]
    pub const fn assigned_staff_id(&self) -> Option<&StaffId> {
        self.assigned_staff_id.as_ref()
    }

    /// Returns the checklist in display order.
    #[must_use]
    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    /// Returns whether the job started without a usable position.
    #[must_use]
    pub const fn location_unavailable(&self) -> bool {
        self.location_unavailable
    }

    /// Returns when the job was assigned.
    #[must_use]
    pub const fn assigned_at(&self) -> Option<DateTime<Utc>> {
        self.assigned_at
    }

    /// Returns when the job was accepted.
    #[must_use]
    pub const fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    /// Returns when work started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when tracking first detected arrival on site.
    #[must_use]
    pub const fn arrived_at(&self) -> Option<DateTime<Utc>> {
        self.arrived_at
    }

    /// Returns when the job was completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns when the job was cancelled or rejected.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns the cancellation or rejection reason.
    #[must_use]
    pub fn closure_reason(&self) -> Option<&str> {
        self.closure_reason.as_deref()
    }

    /// Returns the completion notes.
    #[must_use]
    pub fn completion_notes(&self) -> Option<&str> {
        self.completion_notes.as_deref()
    }

    /// Returns uploaded completion photo URLs.
    #[must_use]
    pub fn photo_urls(&self) -> &[String] {
        &self.photo_urls
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns required checklist items that are not done.
    #[must_use]
    pub fn missing_requirements(&self) -> Vec<ChecklistItemId> {
        self.checklist
            .iter()
            .filter(|item| item.is_required() && !item.is_done())
            .map(|item| item.id().clone())
            .collect()
    }

    /// Checks the record invariants used when ingesting stored or remote
    /// copies of a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobDomainError::InconsistentRecord`] naming the first
    /// violated invariant, or the constructor validation errors.
    pub fn validate(&self) -> Result<(), JobDomainError> {
        if self.title.trim().is_empty() {
            return Err(JobDomainError::EmptyTitle);
        }
        ensure_unique_items(&self.checklist)?;
        let needs_staff = !matches!(self.status, JobStatus::Pending | JobStatus::Cancelled);
        if needs_staff && self.assigned_staff_id.is_none() {
            return Err(self.inconsistent("status requires an assigned staff member"));
        }
        let milestones = [
            (JobStatus::Accepted, self.accepted_at, "accepted_at"),
            (JobStatus::InProgress, self.started_at, "started_at"),
            (JobStatus::Completed, self.completed_at, "completed_at"),
        ];
        for (status, timestamp, field) in milestones {
            if self.status == status && timestamp.is_none() {
                return Err(self.inconsistent(&format!("{status} job is missing {field}")));
            }
        }
        if self.status == JobStatus::Completed && !self.missing_requirements().is_empty() {
            return Err(self.inconsistent("completed job has open required items"));
        }
        Ok(())
    }

    fn inconsistent(&self, reason: &str) -> JobDomainError {
        JobDomainError::InconsistentRecord {
            job_id: self.id.clone(),
            reason: reason.to_owned(),
        }
    }

    pub(super) fn checklist_item_mut(
        &mut self,
        item_id: &ChecklistItemId,
    ) -> Result<&mut ChecklistItem, JobDomainError> {
        let job_id = self.id.clone();
        self.checklist
            .iter_mut()
            .find(|item| item.id() == item_id)
            .ok_or_else(|| JobDomainError::UnknownChecklistItem {
                job_id,
                item_id: item_id.clone(),
            })
    }

    pub(super) const fn set_status(&mut self, status: JobStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    pub(super) fn record_assignment(&mut self, staff_id: StaffId, at: DateTime<Utc>) {
        self.assigned_staff_id = Some(staff_id);
        self.assigned_at = Some(at);
    }

    pub(super) const fn record_acceptance(&mut self, at: DateTime<Utc>) {
        self.accepted_at = Some(at);
    }

    pub(super) const fn record_start(&mut self, at: DateTime<Utc>, location_unavailable: bool) {
        self.started_at = Some(at);
        self.location_unavailable = location_unavailable;
    }

    pub(super) const fn record_arrival(&mut self, at: DateTime<Utc>) {
        if self.arrived_at.is_none() {
            self.arrived_at = Some(at);
        }
        self.updated_at = at;
    }

    pub(super) fn record_completion(
        &mut self,
        at: DateTime<Utc>,
        notes: Option<String>,
        photo_urls: Vec<String>,
    ) {
        self.completed_at = Some(at);
        self.completion_notes = notes;
        self.photo_urls = photo_urls;
    }

    pub(super) fn record_closure(&mut self, at: DateTime<Utc>, reason: String) {
        self.closed_at = Some(at);
        self.closure_reason = Some(reason);
    }

    pub(super) const fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl SyncDocument for Job {
    const COLLECTION: Collection = Collection::Jobs;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn validate(&self) -> Result<(), String> {
        Self::validate(self).map_err(|err| err.to_string())
    }
}

fn ensure_unique_items(checklist: &[ChecklistItem]) -> Result<(), JobDomainError> {
    let mut seen = HashSet::new();
    for item in checklist {
        if !seen.insert(item.id()) {
            return Err(JobDomainError::DuplicateChecklistItem(item.id().clone()));
        }
    }
    Ok(())
}
