//! Contracts for the collaborators that surround the engine.
//!
//! Identity issuance and notification delivery live outside this crate; the
//! engine only depends on the narrow traits defined here. In-memory
//! implementations are provided for tests and local simulation, together
//! with a [`ManualClock`] for deterministic time.

mod clock;
mod identity;
mod notification;

pub use clock::{ManualClock, SharedClock};
pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use notification::{NotificationDispatcher, RecordedNotification, RecordingNotificationDispatcher};
