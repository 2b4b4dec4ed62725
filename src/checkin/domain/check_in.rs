//! Immutable check-in record.

use crate::job::domain::{JobId, StaffId};
use crate::location::domain::{Coordinate, PositionReading};
use crate::sync::domain::{Collection, SyncDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckInId(Uuid);

impl CheckInId {
    /// Creates a new random check-in identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CheckInId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckInId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position and time captured when staff start a job.
///
/// Exposes no mutators: a check-in never changes after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    id: CheckInId,
    job_id: JobId,
    staff_id: StaffId,
    checked_in_at: DateTime<Utc>,
    coordinate: Coordinate,
    accuracy_meters: f64,
    position_captured_at: DateTime<Utc>,
    address: Option<String>,
}

impl CheckIn {
    /// Captures a check-in from a position reading.
    #[must_use]
    pub fn capture(
        job_id: JobId,
        staff_id: StaffId,
        reading: &PositionReading,
        address: Option<String>,
        checked_in_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CheckInId::new(),
            job_id,
            staff_id,
            checked_in_at,
            coordinate: reading.coordinate(),
            accuracy_meters: reading.accuracy_meters(),
            position_captured_at: reading.captured_at(),
            address,
        }
    }

    /// Returns the check-in identifier.
    #[must_use]
    pub const fn id(&self) -> CheckInId {
        self.id
    }

    /// Returns the job checked into.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns the staff member who checked in.
    #[must_use]
    pub const fn staff_id(&self) -> &StaffId {
        &self.staff_id
    }

    /// Returns the check-in time.
    #[must_use]
    pub const fn checked_in_at(&self) -> DateTime<Utc> {
        self.checked_in_at
    }

    /// Returns the captured coordinates.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Returns the accuracy radius in meters.
    #[must_use]
    pub const fn accuracy_meters(&self) -> f64 {
        self.accuracy_meters
    }

    /// Returns the capture time of the underlying position fix.
    #[must_use]
    pub const fn position_captured_at(&self) -> DateTime<Utc> {
        self.position_captured_at
    }

    /// Returns the reverse-geocoded address, when one was resolved.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Rebuilds the position reading the check-in was captured from.
    #[must_use]
    pub fn reading(&self) -> Option<PositionReading> {
        PositionReading::new(self.coordinate, self.accuracy_meters, self.position_captured_at).ok()
    }
}

impl SyncDocument for CheckIn {
    const COLLECTION: Collection = Collection::CheckIns;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn index_key(&self) -> Option<String> {
        Some(self.job_id.to_string())
    }

    fn validate(&self) -> Result<(), String> {
        if !self.accuracy_meters.is_finite() || self.accuracy_meters < 0.0 {
            return Err(format!("invalid accuracy {}", self.accuracy_meters));
        }
        Ok(())
    }
}
