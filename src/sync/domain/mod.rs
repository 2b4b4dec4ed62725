//! Bookkeeping types for synchronisation.

mod backoff;
mod collection;
mod conflict;
mod document;
mod entry;
mod remote;

pub use backoff::{BackoffPolicy, RetryBackoff};
pub use collection::{CacheTable, Collection, ParseCollectionError};
pub use conflict::{Resolution, resolve};
pub use document::SyncDocument;
pub use entry::{CacheEntry, EntryState, Revision};
pub use remote::{DeviceId, RemoteDocument, SubscriptionFilter, WriteOrigin};
