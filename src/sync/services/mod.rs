//! Sync engine orchestration.

mod engine;
mod error;
mod keyed_lock;
mod quarantine;

pub use engine::{
    FlushReport, RemoteOutcome, SyncEngine, SyncEvent, SyncSettings, Update, WriteReceipt,
};
pub use error::{SyncError, SyncResult};
pub use keyed_lock::{KeyedGuard, KeyedLocks};
pub use quarantine::QuarantinedDocument;
