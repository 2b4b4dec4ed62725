//! Tracking session aggregate.

use super::{DistanceHistory, DistanceSample, SessionId, TrackingDomainError};
use crate::job::domain::{JobId, StaffId};
use crate::location::domain::{
    ArrivalRadius, Coordinate, GeofenceClassification, PositionReading, classify, distance_meters,
};
use crate::sync::domain::{Collection, SyncDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle phase of tracking for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session exists for the job.
    Idle,
    /// Samples are being recorded.
    Active,
    /// The session ended; no further samples are accepted.
    Closed,
}

/// Effect of feeding one reading into a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// The reading predates the last processed one and was dropped.
    Stale,
    /// The reading was recorded.
    Recorded {
        /// Distance to the target in meters.
        distance_meters: f64,
        /// Geofence classification of the reading.
        classification: GeofenceClassification,
        /// Whether this reading triggered the one-time arrival event.
        arrived: bool,
    },
}

/// Parameter object for opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackingSession {
    /// Tracked job.
    pub job_id: JobId,
    /// Tracked staff member.
    pub staff_id: StaffId,
    /// Job site coordinates.
    pub target: Coordinate,
    /// Geofence radius for arrival.
    pub arrival_radius: ArrivalRadius,
    /// Sampling interval.
    pub sampling_interval: Duration,
    /// Distance history capacity.
    pub history_capacity: usize,
    /// Session start time.
    pub started_at: DateTime<Utc>,
}

/// Background tracking session for one (job, staff) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSession {
    id: SessionId,
    job_id: JobId,
    staff_id: StaffId,
    target: Coordinate,
    arrival_radius: ArrivalRadius,
    sampling_interval: Duration,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    last_position: Option<PositionReading>,
    last_classification: Option<GeofenceClassification>,
    arrived_at: Option<DateTime<Utc>>,
    permission_lost: bool,
    history: DistanceHistory,
}

impl TrackingSession {
    /// Opens an active session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingDomainError::ZeroHistoryCapacity`] when the history
    /// capacity is zero.
    pub fn open(new_session: NewTrackingSession) -> Result<Self, TrackingDomainError> {
        Ok(Self {
            id: SessionId::new(),
            job_id: new_session.job_id,
            staff_id: new_session.staff_id,
            target: new_session.target,
            arrival_radius: new_session.arrival_radius,
            sampling_interval: new_session.sampling_interval,
            started_at: new_session.started_at,
            ended_at: None,
            last_position: None,
            last_classification: None,
            arrived_at: None,
            permission_lost: false,
            history: DistanceHistory::new(new_session.history_capacity)?,
        })
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the tracked job.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns the tracked staff member.
    #[must_use]
    pub const fn staff_id(&self) -> &StaffId {
        &self.staff_id
    }

    /// Returns the job site coordinates.
    #[must_use]
    pub const fn target(&self) -> Coordinate {
        self.target
    }

    /// Returns the sampling interval.
    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    /// Returns the start time.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the end time, if closed.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Returns the last processed reading.
    #[must_use]
    pub const fn last_position(&self) -> Option<&PositionReading> {
        self.last_position.as_ref()
    }

    /// Returns whether arrival has been detected.
    #[must_use]
    pub const fn has_arrived(&self) -> bool {
        self.arrived_at.is_some()
    }

    /// Returns when arrival was detected.
    #[must_use]
    pub const fn arrived_at(&self) -> Option<DateTime<Utc>> {
        self.arrived_at
    }

    /// Returns whether sampling ended because location permission was lost.
    #[must_use]
    pub const fn permission_lost(&self) -> bool {
        self.permission_lost
    }

    /// Returns the bounded distance history.
    #[must_use]
    pub const fn history(&self) -> &DistanceHistory {
        &self.history
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        if self.ended_at.is_some() {
            SessionPhase::Closed
        } else {
            SessionPhase::Active
        }
    }

    /// Returns whether the session is still active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Feeds one reading through the geofence.
    ///
    /// Readings not newer than the last processed one are dropped, so a
    /// repeated fix is never processed twice. Arrival is
    /// edge-triggered: it fires on the first `Outside → Inside` flip (an
    /// unknown prior counts as outside) and never again for this session.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingDomainError::SessionClosed`] after the session has
    /// been closed.
    pub fn record_reading(
        &mut self,
        reading: PositionReading,
    ) -> Result<SampleOutcome, TrackingDomainError> {
        if !self.is_active() {
            return Err(TrackingDomainError::SessionClosed(self.id));
        }
        if self
            .last_position
            .is_some_and(|last| reading.captured_at() <= last.captured_at())
        {
            return Ok(SampleOutcome::Stale);
        }

        let distance = distance_meters(reading.coordinate(), self.target);
        let classification = classify(distance, self.arrival_radius);
        self.history.push(DistanceSample {
            at: reading.captured_at(),
            meters: distance,
        });

        let previous = self
            .last_classification
            .unwrap_or(GeofenceClassification::Outside);
        let arrived = previous == GeofenceClassification::Outside
            && classification == GeofenceClassification::Inside
            && self.arrived_at.is_none();
        if arrived {
            self.arrived_at = Some(reading.captured_at());
        }
        self.last_position = Some(reading);
        self.last_classification = Some(classification);

        Ok(SampleOutcome::Recorded {
            distance_meters: distance,
            classification,
            arrived,
        })
    }

    /// Records that sampling stopped because permission was revoked.
    pub const fn mark_permission_lost(&mut self) {
        self.permission_lost = true;
    }

    /// Closes the session. Returns `false` when it was already closed.
    pub const fn close(&mut self, at: DateTime<Utc>) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.ended_at = Some(at);
        true
    }
}

impl SyncDocument for TrackingSession {
    const COLLECTION: Collection = Collection::TrackingSessions;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn index_key(&self) -> Option<String> {
        Some(self.job_id.to_string())
    }

    fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    fn validate(&self) -> Result<(), String> {
        if !self.arrival_radius.meters().is_finite() || self.arrival_radius.meters() <= 0.0 {
            return Err("arrival radius must be positive".to_owned());
        }
        if self.history.capacity() == 0 || self.history.len() > self.history.capacity() {
            return Err("distance history violates its capacity".to_owned());
        }
        if self.ended_at.is_some_and(|ended| ended < self.started_at) {
            return Err("session ends before it starts".to_owned());
        }
        Ok(())
    }
}
