//! Error types for tracking session invariants.

use super::SessionId;
use thiserror::Error;

/// Errors raised by tracking session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackingDomainError {
    /// The distance history capacity must be positive.
    #[error("distance history capacity must be positive")]
    ZeroHistoryCapacity,

    /// Samples cannot be appended to a closed session.
    #[error("tracking session {0} is closed")]
    SessionClosed(SessionId),
}
