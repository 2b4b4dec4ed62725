//! File-backed local cache store.
//!
//! Each table is one JSON document inside a capability-scoped directory.
//! Rows are mirrored in memory; every mutation rewrites the table file via a
//! temporary file and an atomic rename so a crash never leaves a torn table.
//! File I/O runs on the blocking thread pool and mutations are serialised by
//! a writer gate, so readers only ever wait for the in-memory mirror.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::sync::{Arc, Mutex};

use crate::sync::{
    domain::CacheTable,
    ports::{CacheStoreError, CacheStoreResult, LocalCacheStore, StoredRecord},
};

type Table = BTreeMap<String, StoredRecord>;

/// Durable cache store persisting tables as JSON files.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: Arc<Dir>,
    tables: Arc<Mutex<HashMap<CacheTable, Table>>>,
    writer: Arc<Mutex<()>>,
}

impl FileCacheStore {
    /// Opens (creating if needed) a store rooted at `path` and loads every
    /// table.
    ///
    /// # Errors
    ///
    /// Returns [`CacheStoreError::Persistence`] when the directory cannot be
    /// opened or read, and [`CacheStoreError::Corrupt`] when a table file
    /// cannot be decoded.
    pub fn open(path: &Utf8Path) -> CacheStoreResult<Self> {
        std::fs::create_dir_all(path).map_err(CacheStoreError::persistence)?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(CacheStoreError::persistence)?;
        let mut tables = HashMap::new();
        for table in CacheTable::ALL {
            tables.insert(table, load_table(&dir, table)?);
        }
        Ok(Self {
            dir: Arc::new(dir),
            tables: Arc::new(Mutex::new(tables)),
            writer: Arc::new(Mutex::new(())),
        })
    }

    async fn mutate<T, F>(&self, table: CacheTable, change: F) -> CacheStoreResult<T>
    where
        F: FnOnce(&mut Table) -> T + Send + 'static,
        T: Send + 'static,
    {
        let dir = Arc::clone(&self.dir);
        let tables = Arc::clone(&self.tables);
        let writer = Arc::clone(&self.writer);
        run_blocking(move || {
            let _gate = writer.lock().map_err(lock_error)?;
            let mut rows = tables
                .lock()
                .map_err(lock_error)?
                .get(&table)
                .cloned()
                .unwrap_or_default();
            let outcome = change(&mut rows);
            write_table(&dir, table, &rows)?;
            tables.lock().map_err(lock_error)?.insert(table, rows);
            Ok(outcome)
        })
        .await
    }

    fn read<T>(&self, table: CacheTable, query: impl FnOnce(&Table) -> T) -> CacheStoreResult<T> {
        let tables = self.tables.lock().map_err(lock_error)?;
        let empty = Table::new();
        Ok(query(tables.get(&table).unwrap_or(&empty)))
    }
}

fn file_name(table: CacheTable) -> String {
    format!("{}.json", table.as_str())
}

fn load_table(dir: &Dir, table: CacheTable) -> CacheStoreResult<Table> {
    let contents = match dir.read_to_string(file_name(table)) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Table::new()),
        Err(err) => return Err(CacheStoreError::persistence(err)),
    };
    serde_json::from_str(&contents).map_err(|err| CacheStoreError::Corrupt {
        table,
        key: file_name(table),
        reason: err.to_string(),
    })
}

fn write_table(dir: &Dir, table: CacheTable, rows: &Table) -> CacheStoreResult<()> {
    let encoded = serde_json::to_vec(rows).map_err(CacheStoreError::persistence)?;
    let final_name = file_name(table);
    let temp_name = format!("{final_name}.tmp");
    dir.write(&temp_name, encoded)
        .map_err(CacheStoreError::persistence)?;
    dir.rename(&temp_name, dir, &final_name)
        .map_err(CacheStoreError::persistence)
}

/// Runs blocking file I/O on the blocking thread pool.
async fn run_blocking<F, T>(f: F) -> CacheStoreResult<T>
where
    F: FnOnce() -> CacheStoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(CacheStoreError::persistence)?
}

fn lock_error(err: impl std::fmt::Display) -> CacheStoreError {
    CacheStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl LocalCacheStore for FileCacheStore {
    async fn put(&self, table: CacheTable, record: StoredRecord) -> CacheStoreResult<()> {
        self.mutate(table, move |rows| {
            rows.insert(record.key.clone(), record);
        })
        .await
    }

    async fn get(&self, table: CacheTable, key: &str) -> CacheStoreResult<Option<StoredRecord>> {
        self.read(table, |rows| rows.get(key).cloned())
    }

    async fn remove(&self, table: CacheTable, key: &str) -> CacheStoreResult<bool> {
        let owned_key = key.to_owned();
        self.mutate(table, move |rows| rows.remove(&owned_key).is_some())
            .await
    }

    async fn list(&self, table: CacheTable) -> CacheStoreResult<Vec<StoredRecord>> {
        self.read(table, |rows| rows.values().cloned().collect())
    }

    async fn find_by_index(
        &self,
        table: CacheTable,
        index_key: &str,
    ) -> CacheStoreResult<Vec<StoredRecord>> {
        self.read(table, |rows| {
            rows.values()
                .filter(|record| record.index_key.as_deref() == Some(index_key))
                .cloned()
                .collect()
        })
    }
}
