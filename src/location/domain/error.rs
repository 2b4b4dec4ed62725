//! Validation errors for location values.

use thiserror::Error;

/// Errors returned while constructing location domain values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationDomainError {
    /// Latitude is outside `[-90, 90]` or not finite.
    #[error("invalid latitude {0}, expected a finite value in [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude is outside `[-180, 180]` or not finite.
    #[error("invalid longitude {0}, expected a finite value in [-180, 180]")]
    InvalidLongitude(f64),

    /// Accuracy radius is negative or not finite.
    #[error("invalid accuracy radius {0}, expected a finite non-negative value")]
    InvalidAccuracy(f64),

    /// Geofence radius is not strictly positive.
    #[error("invalid geofence radius {0}, expected a finite positive value")]
    InvalidRadius(f64),
}
