//! Adapter implementations for synchronisation ports.

pub mod file;
pub mod memory;

pub use file::FileCacheStore;
pub use memory::{InMemoryCacheStore, InMemoryRemoteStore};
