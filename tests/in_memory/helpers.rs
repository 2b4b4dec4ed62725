//! Shared rig for in-memory engine integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fieldtrack::{
    checkin::services::CheckInSettings,
    collaborators::{
        ManualClock, RecordedNotification, RecordingNotificationDispatcher,
        StaticIdentityProvider,
    },
    config::EngineSettings,
    engine::{EngineCollaborators, FieldEngine},
    escalation::domain::EscalationPolicy,
    job::domain::{
        ChecklistItem, ChecklistItemId, Job, JobEvent, JobId, JobType, NewJob, Priority,
        ScheduleWindow, StaffId, apply_transition,
    },
    location::{
        adapters::{ScriptedFix, ScriptedLocationProvider},
        domain::Coordinate,
    },
    sync::{
        adapters::{InMemoryCacheStore, InMemoryRemoteStore},
        domain::{BackoffPolicy, Collection, RemoteDocument},
        services::SyncSettings,
    },
    tracking::services::TrackingSettings,
};
use rstest::fixture;

/// Upper bound on any eventual-consistency wait.
pub const WAIT: Duration = Duration::from_secs(3);

const POLL: Duration = Duration::from_millis(10);

/// Instant `minutes` after the rig epoch.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_225_600 + minutes * 60, 0)
        .single()
        .unwrap_or_default()
}

/// Staff identifier for tests.
///
/// # Errors
///
/// Returns an error when the name is blank.
pub fn staff(name: &str) -> eyre::Result<StaffId> {
    Ok(StaffId::new(name)?)
}

/// Site coordinates of every rig job.
///
/// # Errors
///
/// Returns an error when the coordinate is out of range.
pub fn site() -> eyre::Result<Coordinate> {
    Ok(Coordinate::new(51.5007, -0.1246)?)
}

/// A point roughly `meters` north of the site.
///
/// # Errors
///
/// Returns an error when the coordinate is out of range.
pub fn north_of_site(meters: f64) -> eyre::Result<Coordinate> {
    Ok(Coordinate::new(51.5007 + meters / 111_195.0, -0.1246)?)
}

/// Checklist identifier for tests.
///
/// # Errors
///
/// Returns an error when the identifier is blank.
pub fn item(id: &str) -> eyre::Result<ChecklistItemId> {
    Ok(ChecklistItemId::new(id)?)
}

/// A job assigned to `staff_id`, as the dispatch backend would publish it.
///
/// # Errors
///
/// Returns an error when the job cannot be built.
pub fn assigned_job(id: &str, staff_id: &StaffId) -> eyre::Result<Job> {
    let pending = Job::new(
        NewJob {
            id: JobId::new(id)?,
            title: "Replace lobby lighting".to_owned(),
            job_type: JobType::Maintenance,
            priority: Priority::Medium,
            schedule: ScheduleWindow::new(at(30), at(120))?,
            target: site()?,
            checklist: vec![
                ChecklistItem::new(item("isolate")?, "Isolate circuit", true),
                ChecklistItem::new(item("sweep")?, "Sweep debris", false),
            ],
        },
        at(0),
    )?;
    Ok(apply_transition(
        &pending,
        &JobEvent::Assign {
            staff_id: staff_id.clone(),
            at: at(1),
        },
    )?)
}

/// Wraps a job as a remote document written at `written_at`.
///
/// # Errors
///
/// Returns an error when the job cannot be serialised.
pub fn remote_job(job: &Job, written_at: DateTime<Utc>) -> eyre::Result<RemoteDocument> {
    Ok(RemoteDocument {
        collection: Collection::Jobs,
        id: job.id().to_string(),
        written_at,
        origin: None,
        body: serde_json::to_value(job)?,
    })
}

/// Engine wired to in-memory collaborators the test can steer.
pub struct Rig {
    pub engine: FieldEngine,
    pub cache: Arc<InMemoryCacheStore>,
    pub remote: InMemoryRemoteStore,
    pub clock: ManualClock,
    pub location: ScriptedLocationProvider,
    pub identity: StaticIdentityProvider,
    pub notifier: RecordingNotificationDispatcher,
}

impl Rig {
    /// Builds a rig with a fresh cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(InMemoryCacheStore::new()), ManualClock::new(at(2)))
    }

    /// Builds a rig over an existing cache, as after a process restart.
    pub fn with_cache(cache: Arc<InMemoryCacheStore>, clock: ManualClock) -> Self {
        let remote = InMemoryRemoteStore::new();
        let location = ScriptedLocationProvider::new(Arc::new(clock.clone()));
        let identity = StaticIdentityProvider::default();
        if let Ok(alice) = StaffId::new("alice") {
            identity.set(Some(alice));
        }
        let notifier = RecordingNotificationDispatcher::new();
        let engine = FieldEngine::new(
            EngineCollaborators {
                cache: cache.clone(),
                remote: Arc::new(remote.clone()),
                location: Arc::new(location.clone()),
                geocoder: None,
                identity: Arc::new(identity.clone()),
                notifier: Arc::new(notifier.clone()),
                clock: Arc::new(clock.clone()),
            },
            fast_settings(),
        );
        Self {
            engine,
            cache,
            remote,
            clock,
            location,
            identity,
            notifier,
        }
    }

    /// Scripts one position fix `meters` north of the site.
    ///
    /// # Errors
    ///
    /// Returns an error when the coordinate is out of range.
    pub fn fix_at(&self, meters: f64) -> eyre::Result<()> {
        self.location
            .push_fixes([ScriptedFix::At(north_of_site(meters)?, 5.0)]);
        Ok(())
    }

    /// Publishes an assigned job from the dispatch backend and waits until
    /// it reaches the local cache.
    ///
    /// # Errors
    ///
    /// Returns an error when the job never arrives.
    pub async fn dispatch(&self, id: &str) -> eyre::Result<JobId> {
        let job = assigned_job(id, &staff("alice")?)?;
        self.remote.push_external(remote_job(&job, at(1))?);
        self.job_where(job.id(), |_| true).await?;
        Ok(job.id().clone())
    }

    /// Waits until the cached job satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout.
    pub async fn job_where(
        &self,
        job_id: &JobId,
        predicate: impl Fn(&Job) -> bool,
    ) -> eyre::Result<Job> {
        let polled = tokio::time::timeout(WAIT, async {
            loop {
                if let Ok(Some(job)) = self.engine.lifecycle().job(job_id).await {
                    if predicate(&job) {
                        return job;
                    }
                }
                tokio::time::sleep(POLL).await;
            }
        })
        .await;
        polled.map_err(|_| eyre::eyre!("timed out waiting for job {job_id}"))
    }

    /// Waits until a staff notification starting with `prefix` was sent.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout.
    pub async fn notified(&self, prefix: &str) -> eyre::Result<()> {
        let polled = tokio::time::timeout(WAIT, async {
            while !self.staff_messages().iter().any(|message| message.starts_with(prefix)) {
                tokio::time::sleep(POLL).await;
            }
        })
        .await;
        polled.map_err(|_| eyre::eyre!("timed out waiting for notification {prefix:?}"))
    }

    /// Returns every staff notification body sent so far.
    pub fn staff_messages(&self) -> Vec<String> {
        self.notifier
            .sent()
            .into_iter()
            .filter_map(|notification| match notification {
                RecordedNotification::Staff { message, .. } => Some(message),
                RecordedNotification::Admin(_) => None,
            })
            .collect()
    }

    /// Waits until the remote copy of a job satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or when the remote body is not a job.
    pub async fn remote_job_where(
        &self,
        job_id: &JobId,
        predicate: impl Fn(&Job) -> bool,
    ) -> eyre::Result<Job> {
        let polled = tokio::time::timeout(WAIT, async {
            loop {
                let remote = self
                    .remote
                    .document(Collection::Jobs, job_id.as_str())
                    .and_then(|document| serde_json::from_value::<Job>(document.body).ok());
                if let Some(job) = remote.filter(|job| predicate(job)) {
                    return job;
                }
                tokio::time::sleep(POLL).await;
            }
        })
        .await;
        polled.map_err(|_| eyre::eyre!("timed out waiting for remote job {job_id}"))
    }

    /// Returns the cached job.
    ///
    /// # Errors
    ///
    /// Returns an error when the job is missing.
    pub async fn job(&self, job_id: &JobId) -> eyre::Result<Job> {
        self.engine
            .lifecycle()
            .job(job_id)
            .await?
            .ok_or_else(|| eyre::eyre!("job {job_id} is not cached"))
    }
}

/// Engine settings with millisecond timings.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        tracking: TrackingSettings {
            sampling_interval: Duration::from_millis(20),
            ..TrackingSettings::default()
        },
        check_in: CheckInSettings {
            position_timeout: Duration::from_millis(200),
            geocode_timeout: Duration::from_millis(50),
        },
        escalation: EscalationPolicy::default(),
        sync: SyncSettings {
            backoff: BackoffPolicy {
                base: Duration::from_millis(10),
                factor: 2,
                cap: Duration::from_millis(50),
            },
            ..SyncSettings::default()
        },
    }
}

/// Fresh rig signed in as `alice`.
#[fixture]
pub fn rig() -> Rig {
    Rig::new()
}
