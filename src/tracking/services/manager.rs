//! Owns the sampling task of every active tracking session.

use crate::collaborators::SharedClock;
use crate::job::domain::{Job, JobId, StaffId};
use crate::location::{
    domain::{ArrivalRadius, PositionReading},
    ports::LocationProvider,
    services::{PositionSampler, PositionStream, SamplerError},
};
use crate::sync::services::{SyncEngine, SyncError};
use crate::tracking::domain::{
    NewTrackingSession, SampleOutcome, SessionId, SessionPhase, TrackingDomainError,
    TrackingSession,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Tunables for tracking sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingSettings {
    /// Interval between position samples.
    pub sampling_interval: Duration,
    /// Capacity of the per-session distance history.
    pub history_capacity: usize,
    /// Geofence radius for arrival detection.
    pub arrival_radius: ArrivalRadius,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_secs(15),
            history_capacity: 200,
            arrival_radius: ArrivalRadius::DEFAULT,
        }
    }
}

/// Milestones observed while tracking.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingEvent {
    /// The staff member entered the geofence for the first time.
    Arrived {
        /// Tracked job.
        job_id: JobId,
        /// Session that detected the arrival.
        session_id: SessionId,
        /// Tracked staff member.
        staff_id: StaffId,
        /// Capture time of the arriving reading.
        at: DateTime<Utc>,
        /// Distance to the target at arrival.
        distance_meters: f64,
    },
    /// Sampling ended because location permission was revoked.
    PermissionLost {
        /// Tracked job.
        job_id: JobId,
        /// Affected session.
        session_id: SessionId,
    },
}

/// Errors returned by the tracking session manager.
#[derive(Debug, Clone, Error)]
pub enum TrackingError {
    /// Session invariants were violated.
    #[error(transparent)]
    Domain(#[from] TrackingDomainError),

    /// The session could not be read or written.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The job already has an active session.
    #[error("job {0} already has an active tracking session")]
    AlreadyActive(JobId),
}

/// Result type for tracking operations.
pub type TrackingResult<T> = Result<T, TrackingError>;

struct ActiveTracking {
    sampler: Arc<PositionSampler>,
    guard: Arc<Mutex<()>>,
    task: JoinHandle<()>,
}

impl ActiveTracking {
    fn halt(&self) {
        self.sampler.stop();
        self.task.abort();
    }
}

/// Runs one sampling loop per active session.
///
/// Sessions live in the sync engine; the manager only owns the in-process
/// sampling tasks, so a suspended process can rebuild them from the cache
/// with [`resume`](Self::resume).
pub struct TrackingSessionManager {
    provider: Arc<dyn LocationProvider>,
    sync: Arc<SyncEngine>,
    clock: SharedClock,
    settings: TrackingSettings,
    active: Mutex<HashMap<JobId, ActiveTracking>>,
    events: broadcast::Sender<TrackingEvent>,
}

impl TrackingSessionManager {
    /// Creates a manager with no active sessions.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        sync: Arc<SyncEngine>,
        clock: SharedClock,
        settings: TrackingSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            sync,
            clock,
            settings,
            active: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Subscribes to tracking milestones.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.events.subscribe()
    }

    /// Opens a session for `job` and starts sampling.
    ///
    /// `initial` is the check-in reading, when one was captured; it is fed
    /// through the geofence like any other sample.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::AlreadyActive`] when the job already has an
    /// open session, and [`TrackingError::Sync`] when the session cannot be
    /// stored.
    #[tracing::instrument(skip(self, job, initial), fields(job_id = %job.id()))]
    pub async fn open(
        &self,
        job: &Job,
        staff_id: &StaffId,
        initial: Option<PositionReading>,
    ) -> TrackingResult<TrackingSession> {
        let mut active = self.active.lock().await;
        if active.contains_key(job.id()) || self.open_session(job.id()).await?.is_some() {
            return Err(TrackingError::AlreadyActive(job.id().clone()));
        }

        let mut session = TrackingSession::open(NewTrackingSession {
            job_id: job.id().clone(),
            staff_id: staff_id.clone(),
            target: job.target(),
            arrival_radius: self.settings.arrival_radius,
            sampling_interval: self.settings.sampling_interval,
            history_capacity: self.settings.history_capacity,
            started_at: self.clock.utc(),
        })?;
        let outcome = match initial {
            Some(reading) => Some(session.record_reading(reading)?),
            None => None,
        };
        self.sync.write(&session).await?;
        if let Some(outcome) = outcome {
            announce(&self.events, &session, outcome);
        }

        tracing::info!(session_id = %session.id(), "opened tracking session");
        let tracking = self.spawn_loop(&session);
        active.insert(job.id().clone(), tracking);
        Ok(session)
    }

    /// Closes the job's session and tears down its sampler. Idempotent.
    ///
    /// Returns the closed session, or `None` when nothing was open.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Sync`] when the session cannot be stored.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, job_id: &JobId) -> TrackingResult<Option<TrackingSession>> {
        let mut active = self.active.lock().await;
        let tracking = active.remove(job_id);
        let _held = match &tracking {
            Some(tracking) => {
                tracking.halt();
                Some(Arc::clone(&tracking.guard).lock_owned().await)
            }
            None => None,
        };

        let Some(mut session) = self.open_session(job_id).await? else {
            return Ok(None);
        };
        session.close(self.clock.utc());
        self.sync.write(&session).await?;
        tracing::info!(
            session_id = %session.id(),
            samples = session.history().len(),
            arrived = session.has_arrived(),
            "closed tracking session"
        );
        Ok(Some(session))
    }

    /// Pauses every sampling loop while keeping sessions open.
    pub async fn suspend(&self) {
        let mut active = self.active.lock().await;
        let paused = active.len();
        for (_, tracking) in active.drain() {
            tracking.halt();
        }
        if paused > 0 {
            tracing::info!(paused, "suspended tracking");
        }
    }

    /// Restarts sampling for every open session found in the cache that has
    /// no running loop. Returns the number of loops started.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Sync`] when sessions cannot be read.
    pub async fn resume(&self) -> TrackingResult<usize> {
        let mut active = self.active.lock().await;
        let sessions: Vec<TrackingSession> = self.sync.read_all().await?;
        let mut resumed = 0;
        for session in sessions.iter().filter(|session| session.is_active()) {
            let running = active
                .get(session.job_id())
                .is_some_and(|tracking| !tracking.task.is_finished());
            if running || session.permission_lost() {
                continue;
            }
            let tracking = self.spawn_loop(session);
            active.insert(session.job_id().clone(), tracking);
            resumed += 1;
        }
        if resumed > 0 {
            tracing::info!(resumed, "resumed tracking");
        }
        Ok(resumed)
    }

    /// Returns the tracking phase of a job.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Sync`] when sessions cannot be read.
    pub async fn phase(&self, job_id: &JobId) -> TrackingResult<SessionPhase> {
        let sessions: Vec<TrackingSession> = self.sync.find_by_index(job_id.as_str()).await?;
        if sessions.iter().any(TrackingSession::is_active) {
            Ok(SessionPhase::Active)
        } else if sessions.is_empty() {
            Ok(SessionPhase::Idle)
        } else {
            Ok(SessionPhase::Closed)
        }
    }

    /// Returns the most recent session of a job.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Sync`] when sessions cannot be read.
    pub async fn latest_session(&self, job_id: &JobId) -> TrackingResult<Option<TrackingSession>> {
        let sessions: Vec<TrackingSession> = self.sync.find_by_index(job_id.as_str()).await?;
        Ok(sessions
            .into_iter()
            .max_by_key(TrackingSession::started_at))
    }

    /// Returns whether a sampling loop is running for the job.
    pub async fn is_sampling(&self, job_id: &JobId) -> bool {
        self.active
            .lock()
            .await
            .get(job_id)
            .is_some_and(|tracking| !tracking.task.is_finished())
    }

    async fn open_session(&self, job_id: &JobId) -> TrackingResult<Option<TrackingSession>> {
        let sessions: Vec<TrackingSession> = self.sync.find_by_index(job_id.as_str()).await?;
        Ok(sessions.into_iter().find(TrackingSession::is_active))
    }

    fn spawn_loop(&self, session: &TrackingSession) -> ActiveTracking {
        let sampler = Arc::new(PositionSampler::new(Arc::clone(&self.provider)));
        let guard = Arc::new(Mutex::new(()));
        let sampling = SamplingLoop {
            sync: Arc::clone(&self.sync),
            events: self.events.clone(),
            session_id: session.id(),
            guard: Arc::clone(&guard),
        };
        let stream = sampler.start(session.sampling_interval());
        let task = tokio::spawn(sampling.run(stream));
        ActiveTracking {
            sampler,
            guard,
            task,
        }
    }
}

impl Drop for TrackingSessionManager {
    fn drop(&mut self) {
        for tracking in self.active.get_mut().values() {
            tracking.halt();
        }
    }
}

struct SamplingLoop {
    sync: Arc<SyncEngine>,
    events: broadcast::Sender<TrackingEvent>,
    session_id: SessionId,
    guard: Arc<Mutex<()>>,
}

impl SamplingLoop {
    async fn run(self, mut stream: PositionStream) {
        while let Some(sample) = stream.next().await {
            let keep_going = match sample {
                Ok(reading) => self.process(reading).await,
                Err(SamplerError::PermissionDenied) => {
                    self.permission_lost().await;
                    false
                }
                Err(err) => {
                    tracing::debug!(error = %err, session_id = %self.session_id, "sample skipped");
                    true
                }
            };
            if !keep_going {
                break;
            }
        }
    }

    async fn process(&self, reading: PositionReading) -> bool {
        let _held = self.guard.lock().await;
        let mut session = match self.load().await {
            Some(session) if session.is_active() => session,
            _ => return false,
        };
        let outcome = match session.record_reading(reading) {
            Ok(SampleOutcome::Stale) => return true,
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "dropping sample");
                return false;
            }
        };
        if let Err(err) = self.sync.write(&session).await {
            tracing::warn!(error = %err, session_id = %self.session_id, "failed to store sample");
            return true;
        }
        announce(&self.events, &session, outcome);
        true
    }

    async fn permission_lost(&self) {
        let _held = self.guard.lock().await;
        let Some(mut session) = self.load().await.filter(TrackingSession::is_active) else {
            return;
        };
        session.mark_permission_lost();
        if let Err(err) = self.sync.write(&session).await {
            tracing::warn!(
                error = %err,
                session_id = %self.session_id,
                "failed to store permission loss"
            );
        }
        tracing::warn!(session_id = %self.session_id, "location permission lost, sampling stopped");
        let _receivers = self.events.send(TrackingEvent::PermissionLost {
            job_id: session.job_id().clone(),
            session_id: session.id(),
        });
    }

    async fn load(&self) -> Option<TrackingSession> {
        match self.sync.read(&self.session_id.to_string()).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, session_id = %self.session_id, "cannot load session");
                None
            }
        }
    }
}

fn announce(
    events: &broadcast::Sender<TrackingEvent>,
    session: &TrackingSession,
    outcome: SampleOutcome,
) {
    let SampleOutcome::Recorded {
        distance_meters,
        arrived: true,
        ..
    } = outcome
    else {
        return;
    };
    let Some(at) = session.arrived_at() else {
        return;
    };
    tracing::info!(
        job_id = %session.job_id(),
        session_id = %session.id(),
        distance_meters,
        "staff arrived on site"
    );
    let _receivers = events.send(TrackingEvent::Arrived {
        job_id: session.job_id().clone(),
        session_id: session.id(),
        staff_id: session.staff_id().clone(),
        at,
        distance_meters,
    });
}
