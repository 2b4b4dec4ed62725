//! Tracking session model.

mod error;
mod history;
mod ids;
mod session;

pub use error::TrackingDomainError;
pub use history::{DistanceHistory, DistanceSample};
pub use ids::SessionId;
pub use session::{NewTrackingSession, SampleOutcome, SessionPhase, TrackingSession};
