//! Service layer for job lifecycle orchestration.

use crate::checkin::{
    domain::{CheckIn, CheckInError},
    services::CheckInCoordinator,
};
use crate::collaborators::{IdentityProvider, NotificationDispatcher, SharedClock};
use crate::escalation::{
    domain::AlertResolution,
    services::{EscalationError, EscalationMonitor},
};
use crate::job::domain::{
    ChecklistItemId, CompletionPayload, Job, JobDomainError, JobEvent, JobId, StaffId,
    apply_transition,
};
use crate::sync::{
    domain::Collection,
    services::{KeyedGuard, KeyedLocks, SyncEngine, SyncError, SyncEvent},
};
use crate::tracking::{
    domain::TrackingSession,
    services::{TrackingEvent, TrackingSessionManager},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for job lifecycle operations.
#[derive(Debug, Error)]
pub enum JobLifecycleError {
    /// The state machine refused the event.
    #[error(transparent)]
    Domain(#[from] JobDomainError),
    /// The job could not be read or written.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// The check-in deadline could not be armed.
    #[error(transparent)]
    Escalation(#[from] EscalationError),
    /// No job exists with the given identifier.
    #[error("job {0} not found")]
    NotFound(JobId),
    /// Another transition of the same job is still running.
    #[error("a transition of job {0} is already in progress")]
    TransitionInProgress(JobId),
    /// No staff member is signed in.
    #[error("no staff member is signed in")]
    NoActiveStaff,
}

/// Result type for lifecycle service operations.
pub type JobLifecycleResult<T> = Result<T, JobLifecycleError>;

/// Everything that happened while starting a job.
///
/// Check-in and tracking failures never fail the start; they are reported
/// here and reflected in the job's `location_unavailable` flag.
#[derive(Debug)]
pub struct StartOutcome {
    /// The job, now `in_progress`.
    pub job: Job,
    /// The captured check-in, if any.
    pub check_in: Option<CheckIn>,
    /// Why no check-in was captured.
    pub check_in_error: Option<CheckInError>,
    /// The opened tracking session, if any.
    pub session: Option<TrackingSession>,
}

/// Job lifecycle orchestration service.
///
/// Every operation applies one event through [`apply_transition`] to the
/// cached job inside a single [`SyncEngine::update`] turn, so a remote push
/// can never be overwritten by a transition computed from an older copy.
/// Side effects of the new state run afterwards; a failing side effect is
/// logged and never undoes or hides the transition. Operations on one job
/// are serialised: a user-initiated operation arriving while another is in
/// flight fails with [`JobLifecycleError::TransitionInProgress`].
pub struct JobLifecycleService {
    sync: Arc<SyncEngine>,
    check_ins: Arc<CheckInCoordinator>,
    tracking: Arc<TrackingSessionManager>,
    escalation: Arc<EscalationMonitor>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: SharedClock,
    turns: KeyedLocks<JobId>,
}

/// Collaborators of [`JobLifecycleService`].
pub struct JobLifecycleDeps {
    /// Entity reads and writes.
    pub sync: Arc<SyncEngine>,
    /// Check-in capture.
    pub check_ins: Arc<CheckInCoordinator>,
    /// Tracking sessions.
    pub tracking: Arc<TrackingSessionManager>,
    /// Missed-check-in deadlines.
    pub escalation: Arc<EscalationMonitor>,
    /// Signed-in staff member.
    pub identity: Arc<dyn IdentityProvider>,
    /// Staff notifications.
    pub notifier: Arc<dyn NotificationDispatcher>,
    /// Time source.
    pub clock: SharedClock,
}

impl JobLifecycleService {
    /// Creates a lifecycle service.
    #[must_use]
    pub fn new(deps: JobLifecycleDeps) -> Self {
        Self {
            sync: deps.sync,
            check_ins: deps.check_ins,
            tracking: deps.tracking,
            escalation: deps.escalation,
            identity: deps.identity,
            notifier: deps.notifier,
            clock: deps.clock,
            turns: KeyedLocks::new(),
        }
    }

    /// Returns the cached snapshot of a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::Sync`] when the cache cannot be read.
    pub async fn job(&self, job_id: &JobId) -> JobLifecycleResult<Option<Job>> {
        Ok(self.sync.read(job_id.as_str()).await?)
    }

    /// Assigns a pending job to a staff member.
    ///
    /// Used by the external assignment process; needs no signed-in staff.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::Domain`] when the job is not pending.
    pub async fn assign(&self, job_id: &JobId, staff_id: &StaffId) -> JobLifecycleResult<Job> {
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::Assign {
            staff_id: staff_id.clone(),
            at: self.clock.utc(),
        };
        let job = self.transition(job_id, &event).await?;
        self.notifier
            .notify(staff_id, &format!("New job assigned: {}", job.title()));
        Ok(job)
    }

    /// Accepts an assigned job and arms its check-in deadline.
    ///
    /// The deadline is persisted before the job is written, so an accepted
    /// job always carries one.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::NoActiveStaff`] without a session,
    /// [`JobLifecycleError::TransitionInProgress`] during another transition
    /// of the job, [`JobLifecycleError::Domain`] with
    /// [`JobDomainError::InvalidTransition`] or
    /// [`JobDomainError::NotAssignedToStaff`] when the state machine refuses,
    /// and [`JobLifecycleError::Escalation`] when the deadline cannot be
    /// stored; the job then stays assigned.
    #[tracing::instrument(skip(self))]
    pub async fn accept(&self, job_id: &JobId, staff_id: &StaffId) -> JobLifecycleResult<Job> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::Accept {
            staff_id: staff_id.clone(),
            at: self.clock.utc(),
        };
        let planned = apply_transition(&self.load(job_id).await?, &event)?;
        self.escalation.arm(&planned).await?;
        match self.transition(job_id, &event).await {
            Ok(job) => Ok(job),
            Err(err) => {
                self.disarm_logged(job_id).await;
                Err(err)
            }
        }
    }

    /// Declines an assigned or accepted job.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`accept`](Self::accept).
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        job_id: &JobId,
        staff_id: &StaffId,
        reason: impl Into<String>,
    ) -> JobLifecycleResult<Job> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::Reject {
            staff_id: staff_id.clone(),
            reason: reason.into(),
            at: self.clock.utc(),
        };
        let job = self.transition(job_id, &event).await?;
        self.disarm_logged(job_id).await;
        Ok(job)
    }

    /// Starts an accepted job.
    ///
    /// Captures a check-in first. A failed check-in does not block the start:
    /// the job is flagged `location_unavailable` instead. The transition is
    /// applied to the job as cached after the check-in, so a cancellation
    /// pushed meanwhile wins. A tracking session is opened unless location
    /// permission is denied.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`accept`](Self::accept), including
    /// [`JobDomainError::InvalidTransition`] when the job left `accepted`
    /// during the check-in. Check-in and tracking failures are reported in
    /// [`StartOutcome`] instead.
    #[tracing::instrument(skip(self))]
    pub async fn start(
        &self,
        job_id: &JobId,
        staff_id: &StaffId,
    ) -> JobLifecycleResult<StartOutcome> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let current = self.load(job_id).await?;
        apply_transition(&current, &self.start_event(staff_id, false))?;

        let (check_in, check_in_error) = match self.check_ins.check_in(&current, staff_id).await {
            Ok(receipt) => (Some(receipt.check_in), None),
            Err(err) => {
                tracing::warn!(error = %err, "starting without check-in");
                (None, Some(err))
            }
        };
        let event = self.start_event(staff_id, check_in.is_none());
        let job = self.transition(job_id, &event).await?;
        self.disarm_logged(job_id).await;

        if check_in.is_some() {
            self.notifier
                .notify(staff_id, &format!("Checked in to {}", job.title()));
            self.resolve_logged(job_id, AlertResolution::AutoResolvedByArrival)
                .await;
        }

        let session = if matches!(check_in_error, Some(CheckInError::PermissionDenied)) {
            None
        } else {
            let initial = check_in.as_ref().and_then(CheckIn::reading);
            match self.tracking.open(&job, staff_id, initial).await {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::warn!(error = %err, "tracking unavailable for started job");
                    None
                }
            }
        };

        Ok(StartOutcome {
            job,
            check_in,
            check_in_error,
            session,
        })
    }

    /// Sets the `done` flag of one checklist item while in progress.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`accept`](Self::accept), plus
    /// [`JobDomainError::UnknownChecklistItem`].
    pub async fn toggle_checklist_item(
        &self,
        job_id: &JobId,
        staff_id: &StaffId,
        item_id: &ChecklistItemId,
        done: bool,
    ) -> JobLifecycleResult<Job> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::ToggleChecklistItem {
            staff_id: staff_id.clone(),
            item_id: item_id.clone(),
            done,
            at: self.clock.utc(),
        };
        self.transition(job_id, &event).await
    }

    /// Completes an in-progress job.
    ///
    /// Closes its tracking session and resolves outstanding alerts. Each
    /// teardown step runs even when an earlier one fails; failures are
    /// logged because the job is already completed.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`accept`](Self::accept), plus
    /// [`JobDomainError::IncompleteRequirements`] listing open required
    /// items.
    #[tracing::instrument(skip(self, payload))]
    pub async fn complete(
        &self,
        job_id: &JobId,
        staff_id: &StaffId,
        payload: CompletionPayload,
    ) -> JobLifecycleResult<Job> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::Complete {
            staff_id: staff_id.clone(),
            payload,
            at: self.clock.utc(),
        };
        let job = self.transition(job_id, &event).await?;
        self.close_tracking_logged(job_id).await;
        self.resolve_logged(job_id, AlertResolution::ResolvedByCompletion)
            .await;
        self.disarm_logged(job_id).await;
        Ok(job)
    }

    /// Cancels a non-terminal job and tears down its tracking and deadline.
    ///
    /// Authorisation is the caller's concern. Teardown failures are logged,
    /// as for [`complete`](Self::complete).
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::Domain`] when the job is terminal.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        job_id: &JobId,
        reason: impl Into<String>,
    ) -> JobLifecycleResult<Job> {
        self.require_identity()?;
        let _turn = self.try_begin(job_id)?;
        let event = JobEvent::Cancel {
            reason: reason.into(),
            at: self.clock.utc(),
        };
        let job = self.transition(job_id, &event).await?;
        self.close_tracking_logged(job_id).await;
        self.disarm_logged(job_id).await;
        Ok(job)
    }

    /// Records the arrival milestone detected by tracking.
    ///
    /// Waits for any in-flight transition of the job instead of failing.
    /// Resolves outstanding alerts as auto-resolved by arrival and notifies
    /// the staff member.
    ///
    /// # Errors
    ///
    /// Returns [`JobLifecycleError::Domain`] when the job is no longer in
    /// progress.
    #[tracing::instrument(skip(self))]
    pub async fn record_arrival(
        &self,
        job_id: &JobId,
        staff_id: &StaffId,
        at: DateTime<Utc>,
    ) -> JobLifecycleResult<Job> {
        let job = {
            let _turn = self.turns.lock(job_id.clone()).await;
            self.transition(job_id, &JobEvent::RecordArrival { at }).await?
        };
        self.resolve_logged(job_id, AlertResolution::AutoResolvedByArrival)
            .await;
        self.notifier
            .notify(staff_id, &format!("Arrived at {}", job.title()));
        Ok(job)
    }

    /// Applies a tracking milestone. Only arrivals change the job; arrivals
    /// for jobs that have already left `in_progress` are dropped.
    pub async fn handle_tracking_event(&self, event: TrackingEvent) {
        let TrackingEvent::Arrived {
            job_id,
            staff_id,
            at,
            ..
        } = event
        else {
            return;
        };
        match self.record_arrival(&job_id, &staff_id, at).await {
            Ok(_) => {}
            Err(JobLifecycleError::Domain(JobDomainError::InvalidTransition { from, .. })) => {
                tracing::debug!(%job_id, %from, "ignoring arrival for job no longer in progress");
            }
            Err(err) => tracing::warn!(%job_id, error = %err, "failed to record arrival"),
        }
    }

    /// Tells the assignee that the backend refused a change to their job.
    ///
    /// Only rejected job writes are handled. The cached job already holds
    /// the rolled-back copy when one was available.
    pub async fn handle_sync_event(&self, event: SyncEvent) {
        let SyncEvent::WriteRejected {
            collection: Collection::Jobs,
            id,
            reason,
            rolled_back,
            ..
        } = event
        else {
            return;
        };
        tracing::warn!(
            job_id = %id,
            %reason,
            rolled_back,
            "job change refused by backend"
        );
        let job = match self.sync.read::<Job>(&id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(job_id = %id, error = %err, "cannot read refused job");
                return;
            }
        };
        if let Some(staff_id) = job.assigned_staff_id() {
            self.notifier.notify(
                staff_id,
                &format!("Change to {} was refused: {reason}", job.title()),
            );
        }
    }

    /// Returns the number of jobs with a transition running or waiting.
    #[cfg(test)]
    pub(crate) fn turns_in_use(&self) -> usize {
        self.turns.len()
    }

    async fn transition(&self, job_id: &JobId, event: &JobEvent) -> JobLifecycleResult<Job> {
        let update = self
            .sync
            .update(job_id.as_str(), |current: &Job| {
                apply_transition(current, event).map_err(JobLifecycleError::from)
            })
            .await?
            .ok_or_else(|| JobLifecycleError::NotFound(job_id.clone()))?;
        tracing::info!(
            %job_id,
            event = event.name(),
            from = %update.previous.status(),
            to = %update.current.status(),
            "job transition applied"
        );
        Ok(update.current)
    }

    async fn load(&self, job_id: &JobId) -> JobLifecycleResult<Job> {
        self.sync
            .read(job_id.as_str())
            .await?
            .ok_or_else(|| JobLifecycleError::NotFound(job_id.clone()))
    }

    fn start_event(&self, staff_id: &StaffId, location_unavailable: bool) -> JobEvent {
        JobEvent::Start {
            staff_id: staff_id.clone(),
            location_unavailable,
            at: self.clock.utc(),
        }
    }

    async fn close_tracking_logged(&self, job_id: &JobId) {
        if let Err(err) = self.tracking.close(job_id).await {
            tracing::warn!(%job_id, error = %err, "failed to close tracking session");
        }
    }

    async fn resolve_logged(&self, job_id: &JobId, resolution: AlertResolution) {
        if let Err(err) = self.escalation.resolve_for_job(job_id, resolution).await {
            tracing::warn!(%job_id, error = %err, ?resolution, "failed to resolve alerts");
        }
    }

    async fn disarm_logged(&self, job_id: &JobId) {
        if let Err(err) = self.escalation.disarm(job_id).await {
            tracing::warn!(%job_id, error = %err, "failed to disarm check-in deadline");
        }
    }

    fn require_identity(&self) -> JobLifecycleResult<StaffId> {
        self.identity
            .current_staff_id()
            .ok_or(JobLifecycleError::NoActiveStaff)
    }

    fn try_begin(&self, job_id: &JobId) -> JobLifecycleResult<KeyedGuard<JobId>> {
        self.turns
            .try_lock(job_id.clone())
            .ok_or_else(|| JobLifecycleError::TransitionInProgress(job_id.clone()))
    }
}
