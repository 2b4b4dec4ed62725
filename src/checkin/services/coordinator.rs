//! Single-shot check-in capture.

use crate::checkin::domain::{CheckIn, CheckInError};
use crate::collaborators::SharedClock;
use crate::job::domain::{Job, JobId, StaffId};
use crate::location::{
    domain::Coordinate,
    ports::{LocationProvider, ReverseGeocoder},
    services::{PositionSampler, SamplerError},
};
use crate::sync::domain::Revision;
use crate::sync::services::SyncEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

/// Timeouts applied while capturing a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInSettings {
    /// Bound on the single position request.
    pub position_timeout: Duration,
    /// Bound on reverse geocoding.
    pub geocode_timeout: Duration,
}

impl Default for CheckInSettings {
    fn default() -> Self {
        Self {
            position_timeout: Duration::from_secs(10),
            geocode_timeout: Duration::from_secs(5),
        }
    }
}

/// Persistence state of a freshly captured check-in.
///
/// A queued record is not a failure: it is stored locally and uploads once
/// connectivity allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStatus {
    /// Written to the local cache and queued for upload.
    Queued {
        /// Local revision of the write.
        revision: Revision,
    },
}

/// Successful check-in capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInReceipt {
    /// The captured record.
    pub check_in: CheckIn,
    /// Where the record stands in the sync pipeline.
    pub persistence: PersistenceStatus,
}

/// Emitted after every successful check-in.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckInEvent {
    /// The captured record.
    pub check_in: CheckIn,
}

/// Captures the position and time at which staff start a job.
pub struct CheckInCoordinator {
    sampler: PositionSampler,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    sync: Arc<SyncEngine>,
    clock: SharedClock,
    settings: CheckInSettings,
    events: broadcast::Sender<CheckInEvent>,
}

impl CheckInCoordinator {
    /// Creates a coordinator. Without a geocoder check-ins carry no address.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
        sync: Arc<SyncEngine>,
        clock: SharedClock,
        settings: CheckInSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            sampler: PositionSampler::new(provider),
            geocoder,
            sync,
            clock,
            settings,
            events,
        }
    }

    /// Subscribes to check-in completion events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CheckInEvent> {
        self.events.subscribe()
    }

    /// Captures, persists and announces a check-in for `job`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckInError::PermissionDenied`],
    /// [`CheckInError::PositionTimeout`] or
    /// [`CheckInError::PositionUnavailable`] when no position is obtained,
    /// and [`CheckInError::Persistence`] when the local cache refuses the
    /// record. Geocoding failures are not errors.
    #[tracing::instrument(skip(self, job), fields(job_id = %job.id()))]
    pub async fn check_in(
        &self,
        job: &Job,
        staff_id: &StaffId,
    ) -> Result<CheckInReceipt, CheckInError> {
        let reading = self
            .sampler
            .current_position(self.settings.position_timeout)
            .await
            .map_err(|err| match err {
                SamplerError::PermissionDenied => CheckInError::PermissionDenied,
                SamplerError::Timeout(timeout) => CheckInError::PositionTimeout(timeout),
                SamplerError::Unavailable(reason) => CheckInError::PositionUnavailable(reason),
            })
            .inspect_err(|err| tracing::warn!(error = %err, "check-in position unavailable"))?;

        let address = self.address_for(reading.coordinate()).await;
        let check_in = CheckIn::capture(
            job.id().clone(),
            staff_id.clone(),
            &reading,
            address,
            self.clock.utc(),
        );
        let receipt = self.sync.write(&check_in).await?;

        tracing::info!(
            check_in_id = %check_in.id(),
            accuracy_meters = check_in.accuracy_meters(),
            has_address = check_in.address().is_some(),
            "captured check-in"
        );
        let _receivers = self.events.send(CheckInEvent {
            check_in: check_in.clone(),
        });
        Ok(CheckInReceipt {
            check_in,
            persistence: PersistenceStatus::Queued {
                revision: receipt.revision,
            },
        })
    }

    /// Returns every check-in recorded for a job.
    ///
    /// # Errors
    ///
    /// Returns [`CheckInError::Persistence`] when the cache cannot be read.
    pub async fn check_ins_for(&self, job_id: &JobId) -> Result<Vec<CheckIn>, CheckInError> {
        let mut check_ins: Vec<CheckIn> = self.sync.find_by_index(job_id.as_str()).await?;
        check_ins.sort_by_key(CheckIn::checked_in_at);
        Ok(check_ins)
    }

    async fn address_for(&self, coordinate: Coordinate) -> Option<String> {
        let geocoder = self.geocoder.as_ref()?;
        match tokio::time::timeout(
            self.settings.geocode_timeout,
            geocoder.reverse_geocode(coordinate),
        )
        .await
        {
            Ok(Ok(address)) => Some(address),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "reverse geocoding failed");
                None
            }
            Err(_elapsed) => {
                tracing::debug!("reverse geocoding timed out");
                None
            }
        }
    }
}
