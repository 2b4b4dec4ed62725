//! Port contracts for the local cache and the remote document store.

pub mod cache;
pub mod remote;

pub use cache::{CacheStoreError, CacheStoreResult, LocalCacheStore, StoredRecord};
pub use remote::{RemoteDocumentStore, RemoteDocumentStream, RemoteStoreError, RemoteStoreResult};
