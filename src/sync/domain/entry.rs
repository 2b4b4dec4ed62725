//! Local cache entry with synchronisation bookkeeping.

use super::{Collection, DeviceId, RemoteDocument, WriteOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing local revision number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// Wraps a raw revision value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Upload state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Optimistic local write queued for upload.
    Pending,
    /// Uploaded, waiting for the remote push to echo it back.
    Sent,
    /// Matches the authoritative remote copy.
    Confirmed,
    /// The remote store refused the write and no authoritative copy was
    /// available to roll back to.
    Rejected,
}

impl EntryState {
    /// Returns whether the entry holds a local write not yet confirmed.
    #[must_use]
    pub const fn is_unconfirmed(self) -> bool {
        matches!(self, Self::Pending | Self::Sent)
    }
}

/// Cached copy of a document plus its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Owning collection.
    pub collection: Collection,
    /// Document identifier.
    pub id: String,
    /// Secondary index key (owning job id), if any.
    pub index_key: Option<String>,
    /// Local revision of the last change.
    pub revision: Revision,
    /// Wall-clock time of the write that produced this body.
    pub written_at: DateTime<Utc>,
    /// Upload state.
    pub state: EntryState,
    /// Whether the entity is terminal and eligible for eviction.
    pub terminal: bool,
    /// Reason given by the remote store when it refused the write.
    pub rejection: Option<String>,
    /// Serialised document.
    pub body: serde_json::Value,
}

impl CacheEntry {
    /// Builds the remote representation of this entry stamped with the
    /// writing device.
    #[must_use]
    pub fn to_remote(&self, device_id: DeviceId) -> RemoteDocument {
        RemoteDocument {
            collection: self.collection,
            id: self.id.clone(),
            written_at: self.written_at,
            origin: Some(WriteOrigin {
                device_id,
                revision: self.revision,
            }),
            body: self.body.clone(),
        }
    }
}
