//! Missed-check-in deadline monitor.

use crate::checkin::domain::CheckIn;
use crate::collaborators::{NotificationDispatcher, SharedClock};
use crate::escalation::domain::{
    AlertId, AlertResolution, EscalationAlert, EscalationPolicy, PendingDeadline,
};
use crate::job::domain::{Job, JobId, JobStatus};
use crate::sync::{
    domain::CacheTable,
    ports::{CacheStoreError, LocalCacheStore, StoredRecord},
    services::{SyncEngine, SyncError},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use thiserror::Error;
use tokio::task::JoinHandle;

/// Errors returned by the escalation monitor.
#[derive(Debug, Clone, Error)]
pub enum EscalationError {
    /// Jobs, check-ins or alerts could not be read or written.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The deadline table failed.
    #[error(transparent)]
    Cache(#[from] CacheStoreError),

    /// A stored deadline could not be decoded.
    #[error("cannot decode deadline {key}: {reason}")]
    Decode {
        /// Row key.
        key: String,
        /// Serde failure.
        reason: String,
    },

    /// No alert exists with the identifier.
    #[error("escalation alert {0} not found")]
    AlertNotFound(AlertId),
}

/// Result type for escalation operations.
pub type EscalationResult<T> = Result<T, EscalationError>;

/// Outcome of recovering deadlines after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeReport {
    /// Alerts fired for deadlines that passed while suspended.
    pub fired: Vec<EscalationAlert>,
    /// Deadlines whose timers were re-armed.
    pub rearmed: usize,
}

/// Fires one alert per accepted job whose check-in deadline passes.
///
/// Deadlines are persisted in the `pending_deadlines` table before a timer
/// is armed, so [`resume`](Self::resume) can rebuild them after the process
/// was suspended.
pub struct EscalationMonitor {
    sync: Arc<SyncEngine>,
    deadlines: Arc<dyn LocalCacheStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: SharedClock,
    policy: EscalationPolicy,
    timers: Mutex<HashMap<JobId, JoinHandle<()>>>,
    firing: tokio::sync::Mutex<()>,
}

impl EscalationMonitor {
    /// Creates a monitor storing deadlines in the sync engine's cache.
    #[must_use]
    pub fn new(
        sync: Arc<SyncEngine>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: SharedClock,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            deadlines: sync.cache(),
            sync,
            notifier,
            clock,
            policy,
            timers: Mutex::new(HashMap::new()),
            firing: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the deadline policy.
    #[must_use]
    pub const fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    /// Persists and arms the check-in deadline of an accepted job.
    ///
    /// Returns `None` when the job is not accepted or has no anchor instant.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Cache`] when the deadline cannot be stored.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id()))]
    pub async fn arm(self: &Arc<Self>, job: &Job) -> EscalationResult<Option<PendingDeadline>> {
        let (JobStatus::Accepted, Some(staff_id)) = (job.status(), job.assigned_staff_id()) else {
            return Ok(None);
        };
        let Some(deadline) = self.policy.deadline_for(job) else {
            tracing::warn!("no anchor instant for check-in deadline");
            return Ok(None);
        };
        let pending = PendingDeadline {
            job_id: job.id().clone(),
            staff_id: staff_id.clone(),
            deadline,
            armed_at: self.clock.utc(),
        };
        self.store_deadline(&pending).await?;
        self.schedule(&pending);
        tracing::info!(%deadline, "armed check-in deadline");
        Ok(Some(pending))
    }

    /// Cancels the deadline of a job. Returns whether one was pending.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Cache`] when the deadline cannot be removed.
    pub async fn disarm(&self, job_id: &JobId) -> EscalationResult<bool> {
        self.cancel_timer(job_id);
        let removed = self
            .deadlines
            .remove(CacheTable::PendingDeadlines, job_id.as_str())
            .await?;
        if removed {
            tracing::debug!(%job_id, "disarmed check-in deadline");
        }
        Ok(removed)
    }

    /// Returns the pending deadline of a job.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError`] when the deadline cannot be read.
    pub async fn pending_deadline(
        &self,
        job_id: &JobId,
    ) -> EscalationResult<Option<PendingDeadline>> {
        match self
            .deadlines
            .get(CacheTable::PendingDeadlines, job_id.as_str())
            .await?
        {
            Some(record) => decode_deadline(record).map(Some),
            None => Ok(None),
        }
    }

    /// Handles an elapsed deadline.
    ///
    /// The deadline is stale, and silently dropped, when the job advanced
    /// past `accepted` or a check-in exists. Otherwise one alert is stored
    /// and delivered to the staff member and to administrators. The deadline
    /// is consumed either way; it is never retried.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError`] when state cannot be read or written.
    #[tracing::instrument(skip(self))]
    pub async fn fire(&self, job_id: &JobId) -> EscalationResult<Option<EscalationAlert>> {
        let _firing = self.firing.lock().await;
        let Some(pending) = self.pending_deadline(job_id).await? else {
            return Ok(None);
        };
        let now = self.clock.utc();
        if !pending.is_due(now) {
            return Ok(None);
        }
        self.forget_timer(job_id);

        if self.is_stale(&pending).await? {
            tracing::debug!("check-in deadline is stale");
            self.deadlines
                .remove(CacheTable::PendingDeadlines, job_id.as_str())
                .await?;
            return Ok(None);
        }

        let alert = EscalationAlert::fire(
            pending.job_id.clone(),
            pending.staff_id.clone(),
            pending.deadline,
            now,
        );
        self.sync.write(&alert).await?;
        self.deadlines
            .remove(CacheTable::PendingDeadlines, job_id.as_str())
            .await?;

        tracing::warn!(
            alert_id = %alert.id(),
            staff_id = %pending.staff_id,
            deadline = %pending.deadline,
            "missed check-in escalated"
        );
        self.notifier.notify(
            &pending.staff_id,
            &format!("Check-in overdue for job {job_id}"),
        );
        self.notifier.notify_admins(&alert);
        Ok(Some(alert))
    }

    /// Fires every deadline that is due now.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError`] when state cannot be read or written.
    pub async fn fire_due(&self) -> EscalationResult<Vec<EscalationAlert>> {
        let now = self.clock.utc();
        let mut fired = Vec::new();
        for pending in self.all_deadlines().await? {
            if pending.is_due(now) {
                fired.extend(self.fire(&pending.job_id).await?);
            }
        }
        Ok(fired)
    }

    /// Rebuilds timers from the deadline table after a restart.
    ///
    /// Deadlines that passed while the process was suspended fire
    /// immediately; the rest are re-armed.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError`] when state cannot be read or written.
    pub async fn resume(self: &Arc<Self>) -> EscalationResult<ResumeReport> {
        let now = self.clock.utc();
        let mut report = ResumeReport::default();
        for pending in self.all_deadlines().await? {
            if pending.is_due(now) {
                report.fired.extend(self.fire(&pending.job_id).await?);
            } else {
                self.schedule(&pending);
                report.rearmed += 1;
            }
        }
        tracing::info!(
            fired = report.fired.len(),
            rearmed = report.rearmed,
            "recovered check-in deadlines"
        );
        Ok(report)
    }

    /// Resolves every open alert of a job.
    ///
    /// Notifications already sent are not retracted.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Sync`] when alerts cannot be read or
    /// written.
    pub async fn resolve_for_job(
        &self,
        job_id: &JobId,
        resolution: AlertResolution,
    ) -> EscalationResult<Vec<EscalationAlert>> {
        let now = self.clock.utc();
        let mut resolved = Vec::new();
        for mut alert in self.alerts_for(job_id).await? {
            if alert.resolve(resolution, now) {
                self.sync.write(&alert).await?;
                tracing::info!(alert_id = %alert.id(), %resolution, "resolved escalation alert");
                resolved.push(alert);
            }
        }
        Ok(resolved)
    }

    /// Marks an alert as acknowledged by an administrator. Acknowledging a
    /// resolved alert leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::AlertNotFound`] for unknown alerts.
    pub async fn acknowledge(&self, alert_id: AlertId) -> EscalationResult<EscalationAlert> {
        let mut alert: EscalationAlert = self
            .sync
            .read(&alert_id.to_string())
            .await?
            .ok_or(EscalationError::AlertNotFound(alert_id))?;
        if alert.resolve(AlertResolution::ManuallyAcknowledged, self.clock.utc()) {
            self.sync.write(&alert).await?;
            tracing::info!(%alert_id, "escalation alert acknowledged");
        }
        Ok(alert)
    }

    /// Returns every alert raised for a job, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::Sync`] when alerts cannot be read.
    pub async fn alerts_for(&self, job_id: &JobId) -> EscalationResult<Vec<EscalationAlert>> {
        let mut alerts: Vec<EscalationAlert> = self.sync.find_by_index(job_id.as_str()).await?;
        alerts.sort_by_key(EscalationAlert::fired_at);
        Ok(alerts)
    }

    /// Cancels every armed timer. Persisted deadlines are kept.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, timer) in timers.drain() {
            timer.abort();
        }
    }

    async fn is_stale(&self, pending: &PendingDeadline) -> EscalationResult<bool> {
        let job: Option<Job> = self.sync.read(pending.job_id.as_str()).await?;
        if job.is_none_or(|job| job.status() != JobStatus::Accepted) {
            return Ok(true);
        }
        let check_ins: Vec<CheckIn> = self.sync.find_by_index(pending.job_id.as_str()).await?;
        if !check_ins.is_empty() {
            return Ok(true);
        }
        let already_alerted = self
            .alerts_for(&pending.job_id)
            .await?
            .iter()
            .any(|alert| alert.deadline() == pending.deadline);
        Ok(already_alerted)
    }

    async fn store_deadline(&self, pending: &PendingDeadline) -> EscalationResult<()> {
        let value = serde_json::to_value(pending).map_err(|err| EscalationError::Decode {
            key: pending.job_id.to_string(),
            reason: err.to_string(),
        })?;
        self.deadlines
            .put(
                CacheTable::PendingDeadlines,
                StoredRecord::new(pending.job_id.as_str(), None, value),
            )
            .await?;
        Ok(())
    }

    async fn all_deadlines(&self) -> EscalationResult<Vec<PendingDeadline>> {
        let mut deadlines = self
            .deadlines
            .list(CacheTable::PendingDeadlines)
            .await?
            .into_iter()
            .map(decode_deadline)
            .collect::<EscalationResult<Vec<_>>>()?;
        deadlines.sort_by_key(|pending| pending.deadline);
        Ok(deadlines)
    }

    fn schedule(self: &Arc<Self>, pending: &PendingDeadline) {
        let wait = remaining(pending.deadline, self.clock.utc());
        let monitor: Weak<Self> = Arc::downgrade(self);
        let job_id = pending.job_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            if let Err(err) = monitor.fire(&job_id).await {
                tracing::warn!(error = %err, %job_id, "failed to fire check-in deadline");
            }
        });
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timers.insert(pending.job_id.clone(), timer) {
            previous.abort();
        }
    }

    fn forget_timer(&self, job_id: &JobId) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        drop(timers.remove(job_id));
    }

    fn cancel_timer(&self, job_id: &JobId) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = timers.remove(job_id) {
            timer.abort();
        }
    }
}

impl Drop for EscalationMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or_default()
}

fn decode_deadline(record: StoredRecord) -> EscalationResult<PendingDeadline> {
    serde_json::from_value(record.value).map_err(|err| EscalationError::Decode {
        key: record.key,
        reason: err.to_string(),
    })
}
