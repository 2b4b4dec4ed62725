//! Composition root.
//!
//! [`FieldEngine`] wires every service to the injected collaborators and
//! owns the background tasks started by [`FieldEngine::init`].

use crate::checkin::services::CheckInCoordinator;
use crate::collaborators::{IdentityProvider, NotificationDispatcher, SharedClock};
use crate::config::EngineSettings;
use crate::escalation::services::{EscalationError, EscalationMonitor};
use crate::job::services::{JobLifecycleDeps, JobLifecycleService};
use crate::location::ports::{LocationProvider, ReverseGeocoder};
use crate::sync::{
    domain::{Collection, SubscriptionFilter},
    ports::{LocalCacheStore, RemoteDocumentStore},
    services::{SyncEngine, SyncError},
};
use crate::tracking::services::{TrackingError, TrackingSessionManager};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast::error::RecvError};
use tokio::task::JoinHandle;

/// Errors raised while starting the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Sync state could not be restored.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// Deadlines could not be restored.
    #[error(transparent)]
    Escalation(#[from] EscalationError),
    /// Tracking sessions could not be restored.
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    /// No staff member is signed in.
    #[error("no staff member is signed in")]
    NoActiveStaff,
    /// `init` was called on a running engine.
    #[error("engine is already running")]
    AlreadyRunning,
}

/// Result type for engine lifecycle operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Platform and backend collaborators injected into the engine.
pub struct EngineCollaborators {
    /// Durable local cache.
    pub cache: Arc<dyn LocalCacheStore>,
    /// Remote document store.
    pub remote: Arc<dyn RemoteDocumentStore>,
    /// Platform location service.
    pub location: Arc<dyn LocationProvider>,
    /// Optional reverse geocoder.
    pub geocoder: Option<Arc<dyn ReverseGeocoder>>,
    /// Signed-in staff member.
    pub identity: Arc<dyn IdentityProvider>,
    /// Notification delivery.
    pub notifier: Arc<dyn NotificationDispatcher>,
    /// Time source.
    pub clock: SharedClock,
}

/// What [`FieldEngine::init`] restored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Writes queued for upload from a previous run.
    pub queued_writes: usize,
    /// Deadlines that elapsed while suspended and fired on start.
    pub deadlines_fired: usize,
    /// Deadlines re-armed for later.
    pub deadlines_rearmed: usize,
    /// Tracking sessions whose sampling resumed.
    pub sessions_resumed: usize,
}

/// The field-presence engine.
pub struct FieldEngine {
    identity: Arc<dyn IdentityProvider>,
    sync: Arc<SyncEngine>,
    check_ins: Arc<CheckInCoordinator>,
    tracking: Arc<TrackingSessionManager>,
    escalation: Arc<EscalationMonitor>,
    lifecycle: Arc<JobLifecycleService>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FieldEngine {
    /// Builds every service. Nothing runs until [`init`](Self::init).
    #[must_use]
    pub fn new(collaborators: EngineCollaborators, settings: EngineSettings) -> Self {
        let EngineCollaborators {
            cache,
            remote,
            location,
            geocoder,
            identity,
            notifier,
            clock,
        } = collaborators;
        let sync = Arc::new(SyncEngine::new(
            cache,
            remote,
            Arc::clone(&clock),
            settings.sync,
        ));
        let check_ins = Arc::new(CheckInCoordinator::new(
            Arc::clone(&location),
            geocoder,
            Arc::clone(&sync),
            Arc::clone(&clock),
            settings.check_in,
        ));
        let tracking = Arc::new(TrackingSessionManager::new(
            location,
            Arc::clone(&sync),
            Arc::clone(&clock),
            settings.tracking,
        ));
        let escalation = Arc::new(EscalationMonitor::new(
            Arc::clone(&sync),
            Arc::clone(&notifier),
            Arc::clone(&clock),
            settings.escalation,
        ));
        let lifecycle = Arc::new(JobLifecycleService::new(JobLifecycleDeps {
            sync: Arc::clone(&sync),
            check_ins: Arc::clone(&check_ins),
            tracking: Arc::clone(&tracking),
            escalation: Arc::clone(&escalation),
            identity: Arc::clone(&identity),
            notifier,
            clock,
        }));
        Self {
            identity,
            sync,
            check_ins,
            tracking,
            escalation,
            lifecycle,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Job lifecycle operations.
    #[must_use]
    pub const fn lifecycle(&self) -> &Arc<JobLifecycleService> {
        &self.lifecycle
    }

    /// Entity reads, writes and reconciliation.
    #[must_use]
    pub const fn sync(&self) -> &Arc<SyncEngine> {
        &self.sync
    }

    /// Check-in capture and history.
    #[must_use]
    pub const fn check_ins(&self) -> &Arc<CheckInCoordinator> {
        &self.check_ins
    }

    /// Tracking sessions.
    #[must_use]
    pub const fn tracking(&self) -> &Arc<TrackingSessionManager> {
        &self.tracking
    }

    /// Missed-check-in escalation.
    #[must_use]
    pub const fn escalation(&self) -> &Arc<EscalationMonitor> {
        &self.escalation
    }

    /// Restores persisted state and starts the background tasks.
    ///
    /// Requeues unconfirmed writes, subscribes to remote pushes for the
    /// signed-in staff member, starts the uploader and the relays that feed
    /// arrivals and refused job writes back to the lifecycle service, fires
    /// or re-arms persisted deadlines and resumes open tracking sessions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoActiveStaff`] without a session,
    /// [`EngineError::AlreadyRunning`] on a second call, and the underlying
    /// error when state cannot be restored. Tasks started before the failure
    /// are stopped again.
    #[tracing::instrument(skip(self))]
    pub async fn init(&self) -> EngineResult<InitReport> {
        let staff_id = self
            .identity
            .current_staff_id()
            .ok_or(EngineError::NoActiveStaff)?;
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return Err(EngineError::AlreadyRunning);
        }

        let mut report = InitReport {
            queued_writes: self.sync.init().await?,
            ..InitReport::default()
        };
        let staff = staff_id.as_str();
        let subscriptions = vec![
            (
                Collection::Jobs,
                SubscriptionFilter::field_equals("assigned_staff_id", staff),
            ),
            (
                Collection::TrackingSessions,
                SubscriptionFilter::field_equals("staff_id", staff),
            ),
            (
                Collection::CheckIns,
                SubscriptionFilter::field_equals("staff_id", staff),
            ),
            (
                Collection::EscalationAlerts,
                SubscriptionFilter::field_equals("staff_id", staff),
            ),
        ];
        tasks.push(self.sync.spawn_push_listener(subscriptions).await?);
        tasks.push(self.sync.spawn_flush_worker());
        tasks.push(self.spawn_arrival_relay());
        tasks.push(self.spawn_rejection_relay());

        match self.restore(&mut report).await {
            Ok(()) => {
                tracing::info!(?report, %staff_id, "field engine started");
                Ok(report)
            }
            Err(err) => {
                for task in tasks.drain(..) {
                    task.abort();
                }
                Err(err)
            }
        }
    }

    /// Stops background work. Persisted state is kept for the next `init`.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.tracking.suspend().await;
        self.escalation.shutdown();
        tracing::info!("field engine stopped");
    }

    /// Returns whether background tasks are running.
    pub async fn is_running(&self) -> bool {
        !self.tasks.lock().await.is_empty()
    }

    async fn restore(&self, report: &mut InitReport) -> EngineResult<()> {
        let resumed = self.escalation.resume().await?;
        report.deadlines_fired = resumed.fired.len();
        report.deadlines_rearmed = resumed.rearmed;
        report.sessions_resumed = self.tracking.resume().await?;
        Ok(())
    }

    fn spawn_arrival_relay(&self) -> JoinHandle<()> {
        let mut events = self.tracking.subscribe();
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => lifecycle.handle_tracking_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "tracking event relay lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_rejection_relay(&self) -> JoinHandle<()> {
        let mut events = self.sync.subscribe_events();
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => lifecycle.handle_sync_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "sync event relay lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
