//! Reverse-geocoding port.

use crate::location::domain::Coordinate;
use async_trait::async_trait;
use thiserror::Error;

/// Resolves a coordinate to a human-readable address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Returns the best-known address for the coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] when no address can be resolved.
    async fn reverse_geocode(&self, coordinate: Coordinate) -> Result<String, GeocodeError>;
}

/// Errors returned by reverse-geocoding adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    /// No address is known for the coordinate.
    #[error("no address found")]
    NotFound,

    /// The geocoding service could not be reached.
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
}
