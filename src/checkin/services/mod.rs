//! Check-in orchestration.

mod coordinator;

pub use coordinator::{
    CheckInCoordinator, CheckInEvent, CheckInReceipt, CheckInSettings, PersistenceStatus,
};
