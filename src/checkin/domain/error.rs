//! Check-in failure modes.

use crate::sync::services::SyncError;
use std::time::Duration;
use thiserror::Error;

/// Reasons a check-in could not be captured.
///
/// Each step fails distinctly; callers degrade gracefully rather than block
/// work on any of them.
#[derive(Debug, Clone, Error)]
pub enum CheckInError {
    /// Location access is denied.
    #[error("location permission denied")]
    PermissionDenied,

    /// No position was obtained within the timeout.
    #[error("position request timed out after {0:?}")]
    PositionTimeout(Duration),

    /// The platform reported no usable position.
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    /// The local cache refused the record.
    #[error(transparent)]
    Persistence(#[from] SyncError),
}
