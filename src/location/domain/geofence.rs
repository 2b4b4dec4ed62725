//! Great-circle distance and circular geofence classification.

use super::{Coordinate, LocationDomainError};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Result of comparing a distance against a geofence radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceClassification {
    /// The position lies within the radius (boundary inclusive).
    Inside,
    /// The position lies beyond the radius.
    Outside,
}

/// Positive geofence radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrivalRadius(f64);

impl ArrivalRadius {
    /// Arrival radius used for field jobs unless configured otherwise.
    pub const DEFAULT: Self = Self(30.0);

    /// Creates a validated radius.
    ///
    /// # Errors
    ///
    /// Returns [`LocationDomainError::InvalidRadius`] when the value is not
    /// finite or not strictly positive.
    pub fn new(meters: f64) -> Result<Self, LocationDomainError> {
        if !meters.is_finite() || meters <= 0.0 {
            return Err(LocationDomainError::InvalidRadius(meters));
        }
        Ok(Self(meters))
    }

    /// Returns the radius in meters.
    #[must_use]
    pub const fn meters(self) -> f64 {
        self.0
    }
}

impl Default for ArrivalRadius {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Returns the haversine distance between two coordinates in meters.
///
/// Symmetric in its arguments: component differences are taken as absolute
/// values so `distance_meters(a, b) == distance_meters(b, a)` holds bit for
/// bit.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "haversine distance is inherently floating point"
)]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let delta_lat = (b.latitude() - a.latitude()).abs().to_radians();
    let delta_lon = (b.longitude() - a.longitude()).abs().to_radians();

    let half_lat = (delta_lat / 2.0).sin();
    let half_lon = (delta_lon / 2.0).sin();
    let h = half_lat.mul_add(half_lat, lat_a.cos() * lat_b.cos() * half_lon * half_lon);
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_METERS * central_angle
}

/// Classifies a distance against a geofence radius.
#[must_use]
pub fn classify(distance_meters: f64, radius: ArrivalRadius) -> GeofenceClassification {
    if distance_meters <= radius.meters() {
        GeofenceClassification::Inside
    } else {
        GeofenceClassification::Outside
    }
}
