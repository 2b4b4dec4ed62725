//! Durable key-value storage port for device-local state.

use crate::sync::domain::CacheTable;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for local cache operations.
pub type CacheStoreResult<T> = Result<T, CacheStoreError>;

/// One row of a cache table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Primary key within the table.
    pub key: String,
    /// Optional secondary index key.
    pub index_key: Option<String>,
    /// Serialised row.
    pub value: serde_json::Value,
}

impl StoredRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(key: impl Into<String>, index_key: Option<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            index_key,
            value,
        }
    }
}

/// Durable table-oriented key-value store that survives restarts.
///
/// Implementations must be safe for concurrent use; callers serialise
/// writes per key where ordering matters.
#[async_trait]
pub trait LocalCacheStore: Send + Sync {
    /// Inserts or replaces a record.
    async fn put(&self, table: CacheTable, record: StoredRecord) -> CacheStoreResult<()>;

    /// Returns the record stored under `key`.
    async fn get(&self, table: CacheTable, key: &str) -> CacheStoreResult<Option<StoredRecord>>;

    /// Removes a record, returning whether it existed.
    async fn remove(&self, table: CacheTable, key: &str) -> CacheStoreResult<bool>;

    /// Returns every record of a table.
    async fn list(&self, table: CacheTable) -> CacheStoreResult<Vec<StoredRecord>>;

    /// Returns the records whose secondary index equals `index_key`.
    async fn find_by_index(
        &self,
        table: CacheTable,
        index_key: &str,
    ) -> CacheStoreResult<Vec<StoredRecord>>;
}

/// Errors returned by local cache implementations.
#[derive(Debug, Clone, Error)]
pub enum CacheStoreError {
    /// A stored row could not be decoded.
    #[error("corrupt record {key} in table {table}: {reason}")]
    Corrupt {
        /// Table name.
        table: CacheTable,
        /// Row key.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// Storage-layer failure.
    #[error("cache persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CacheStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
