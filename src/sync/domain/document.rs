//! Contract for entities that can be synchronised.

use super::Collection;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An entity stored in a remote collection and mirrored in the cache.
pub trait SyncDocument: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the entity belongs to.
    const COLLECTION: Collection;

    /// Returns the document identifier within the collection.
    fn document_id(&self) -> String;

    /// Returns the secondary index key (the owning job id), if any.
    fn index_key(&self) -> Option<String> {
        None
    }

    /// Returns whether the entity reached a terminal state and may be
    /// evicted after the retention window.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Checks schema invariants beyond what deserialisation enforces.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}
