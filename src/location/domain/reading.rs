//! Single position fix produced by the platform.

use super::{Coordinate, LocationDomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position fix with its accuracy radius and capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    coordinate: Coordinate,
    accuracy_meters: f64,
    captured_at: DateTime<Utc>,
}

impl PositionReading {
    /// Creates a reading.
    ///
    /// # Errors
    ///
    /// Returns [`LocationDomainError::InvalidAccuracy`] when the accuracy
    /// radius is negative or not finite.
    pub fn new(
        coordinate: Coordinate,
        accuracy_meters: f64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, LocationDomainError> {
        if !accuracy_meters.is_finite() || accuracy_meters < 0.0 {
            return Err(LocationDomainError::InvalidAccuracy(accuracy_meters));
        }
        Ok(Self {
            coordinate,
            accuracy_meters,
            captured_at,
        })
    }

    /// Returns the captured coordinate.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Returns the accuracy radius in meters.
    #[must_use]
    pub const fn accuracy_meters(&self) -> f64 {
        self.accuracy_meters
    }

    /// Returns the capture timestamp.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}
