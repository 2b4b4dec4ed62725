//! Tracking session orchestration.

mod manager;

pub use manager::{TrackingError, TrackingEvent, TrackingSessionManager, TrackingSettings};
