//! Sync engine errors.

use crate::sync::{
    domain::Collection,
    ports::{CacheStoreError, RemoteStoreError},
};
use thiserror::Error;

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The local cache failed.
    #[error(transparent)]
    Cache(#[from] CacheStoreError),

    /// The remote store failed.
    #[error(transparent)]
    Remote(#[from] RemoteStoreError),

    /// A local write violated the entity schema.
    #[error("invalid {collection} document {id}: {reason}")]
    Invalid {
        /// Collection of the document.
        collection: Collection,
        /// Document identifier.
        id: String,
        /// Violated invariant.
        reason: String,
    },

    /// A cached row could not be encoded or decoded.
    #[error("cannot decode {collection} document {id}: {reason}")]
    Decode {
        /// Collection of the document.
        collection: Collection,
        /// Document identifier.
        id: String,
        /// Serde failure.
        reason: String,
    },
}
