//! In-memory local cache store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::sync::{
    domain::CacheTable,
    ports::{CacheStoreError, CacheStoreResult, LocalCacheStore, StoredRecord},
};

/// Thread-safe in-memory cache store. Contents die with the process.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    state: Arc<RwLock<HashMap<CacheTable, BTreeMap<String, StoredRecord>>>>,
}

impl InMemoryCacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> CacheStoreError {
    CacheStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl LocalCacheStore for InMemoryCacheStore {
    async fn put(&self, table: CacheTable, record: StoredRecord) -> CacheStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .entry(table)
            .or_default()
            .insert(record.key.clone(), record);
        Ok(())
    }

    async fn get(&self, table: CacheTable, key: &str) -> CacheStoreResult<Option<StoredRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.get(&table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn remove(&self, table: CacheTable, key: &str) -> CacheStoreResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(state
            .get_mut(&table)
            .and_then(|rows| rows.remove(key))
            .is_some())
    }

    async fn list(&self, table: CacheTable) -> CacheStoreResult<Vec<StoredRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_index(
        &self,
        table: CacheTable,
        index_key: &str,
    ) -> CacheStoreResult<Vec<StoredRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .get(&table)
            .map(|rows| {
                rows.values()
                    .filter(|record| record.index_key.as_deref() == Some(index_key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
