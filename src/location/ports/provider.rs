//! Platform location access port.

use crate::location::domain::PositionReading;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for platform location reads.
pub type LocationProviderResult<T> = Result<T, LocationProviderError>;

/// Location permission state reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    /// The user granted location access.
    Granted,
    /// The user denied location access.
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

/// Single-read access to the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Returns the current permission state without prompting.
    async fn permission(&self) -> LocationPermission;

    /// Reads one high-confidence position fix.
    ///
    /// # Errors
    ///
    /// Returns [`LocationProviderError::PermissionDenied`] when access is not
    /// granted and [`LocationProviderError::NoSignal`] when no fix is
    /// currently obtainable.
    async fn read_position(&self) -> LocationProviderResult<PositionReading>;
}

/// Errors returned by platform location adapters.
#[derive(Debug, Clone, Error)]
pub enum LocationProviderError {
    /// Location access is denied; terminal until the user grants access.
    #[error("location permission denied")]
    PermissionDenied,

    /// No position fix is available right now.
    #[error("no position signal available")]
    NoSignal,

    /// Platform-specific failure.
    #[error("location platform error: {0}")]
    Platform(Arc<dyn std::error::Error + Send + Sync>),
}

impl LocationProviderError {
    /// Wraps a platform error.
    pub fn platform(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Platform(Arc::new(err))
    }
}
