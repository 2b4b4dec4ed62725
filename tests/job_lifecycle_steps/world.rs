//! Shared world state for job lifecycle BDD scenarios.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use fieldtrack::{
    collaborators::{ManualClock, RecordingNotificationDispatcher, StaticIdentityProvider},
    config::FieldTrackConfig,
    engine::{EngineCollaborators, FieldEngine},
    escalation::domain::EscalationAlert,
    job::{
        domain::{Job, JobId, StaffId},
        services::{JobLifecycleError, StartOutcome},
    },
    location::adapters::ScriptedLocationProvider,
    sync::adapters::{InMemoryCacheStore, InMemoryRemoteStore},
};
use rstest::fixture;

/// Scenario world for job lifecycle behaviour tests.
pub struct JobLifecycleWorld {
    pub engine: FieldEngine,
    pub clock: ManualClock,
    pub location: ScriptedLocationProvider,
    pub identity: StaticIdentityProvider,
    pub notifier: RecordingNotificationDispatcher,
    pub job_id: Option<JobId>,
    pub last_result: Option<Result<Job, JobLifecycleError>>,
    pub last_start: Option<StartOutcome>,
    pub fired_alerts: Vec<EscalationAlert>,
}

impl JobLifecycleWorld {
    /// Creates a world with an engine over in-memory collaborators.
    #[must_use]
    pub fn new() -> Self {
        let epoch = Utc
            .timestamp_opt(1_767_225_600, 0)
            .single()
            .unwrap_or_default();
        let clock = ManualClock::new(epoch);
        let location = ScriptedLocationProvider::new(Arc::new(clock.clone()));
        let identity = StaticIdentityProvider::default();
        let notifier = RecordingNotificationDispatcher::new();
        let mut settings = FieldTrackConfig::default()
            .settings()
            .unwrap_or_else(|err| panic!("default configuration is valid: {err}"));
        settings.check_in.position_timeout = std::time::Duration::from_millis(200);
        settings.tracking.sampling_interval = std::time::Duration::from_millis(20);
        let engine = FieldEngine::new(
            EngineCollaborators {
                cache: Arc::new(InMemoryCacheStore::new()),
                remote: Arc::new(InMemoryRemoteStore::new()),
                location: Arc::new(location.clone()),
                geocoder: None,
                identity: Arc::new(identity.clone()),
                notifier: Arc::new(notifier.clone()),
                clock: Arc::new(clock.clone()),
            },
            settings,
        );

        Self {
            engine,
            clock,
            location,
            identity,
            notifier,
            job_id: None,
            last_result: None,
            last_start: None,
            fired_alerts: Vec::new(),
        }
    }

    /// Signs `staff_id` in, as the session collaborator would.
    pub fn sign_in(&self, staff_id: &StaffId) {
        self.identity.set(Some(staff_id.clone()));
    }

    /// Returns the scenario job identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when no job was set up.
    pub fn job_id(&self) -> Result<JobId, eyre::Report> {
        self.job_id
            .clone()
            .ok_or_else(|| eyre::eyre!("missing job in scenario world"))
    }
}

impl Default for JobLifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> JobLifecycleWorld {
    JobLifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
