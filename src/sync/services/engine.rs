//! Offline-first sync engine.

use super::{KeyedGuard, KeyedLocks, QuarantinedDocument, SyncError, SyncResult};
use crate::checkin::domain::CheckIn;
use crate::collaborators::SharedClock;
use crate::escalation::domain::EscalationAlert;
use crate::job::domain::Job;
use crate::sync::{
    domain::{
        BackoffPolicy, CacheEntry, CacheTable, Collection, DeviceId, EntryState, RemoteDocument,
        Resolution, RetryBackoff, Revision, SubscriptionFilter, SyncDocument, resolve,
    },
    ports::{LocalCacheStore, RemoteDocumentStore, RemoteStoreError, StoredRecord},
};
use crate::tracking::domain::TrackingSession;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// Tunables of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Identifier stamped on every upload from this device.
    pub device_id: DeviceId,
    /// Retry schedule for failed uploads.
    pub backoff: BackoffPolicy,
    /// How long confirmed terminal entities stay cached.
    pub retention: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            device_id: DeviceId::new(),
            backoff: BackoffPolicy::default(),
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Acknowledgement of a local write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Collection written.
    pub collection: Collection,
    /// Document identifier.
    pub id: String,
    /// Local revision assigned to the write.
    pub revision: Revision,
}

/// Result of [`SyncEngine::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
    /// The cached document the change was applied to.
    pub previous: T,
    /// The document as written.
    pub current: T,
    /// Acknowledgement of the write.
    pub receipt: WriteReceipt,
}

/// Summary of one pass over the upload queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Writes accepted by the remote store.
    pub pushed: usize,
    /// Writes the remote store refused.
    pub rejected: Vec<(Collection, String)>,
    /// Writes left queued because the remote store was unreachable.
    pub deferred: usize,
}

impl FlushReport {
    /// Returns whether the queue was drained.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.deferred == 0
    }
}

/// Effect of applying a remote push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOutcome {
    /// The document was not cached before.
    Inserted,
    /// The remote copy replaced the cached one.
    Replaced,
    /// The push confirmed this device's own write.
    Confirmed,
    /// A newer local write was kept.
    KeptLocal,
    /// The cache already held exactly this copy.
    Unchanged,
    /// The document failed validation and was set aside.
    Quarantined,
}

/// Notifications emitted by the sync engine.
///
/// Terminal upload failures reach the rest of the system only through this
/// stream. The field engine relays rejected job writes to the lifecycle
/// service; embedders that surface other collections must subscribe with
/// [`SyncEngine::subscribe_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The remote store refused a local write. Never retried.
    WriteRejected {
        /// Collection of the refused write.
        collection: Collection,
        /// Document identifier.
        id: String,
        /// Revision that was refused.
        revision: Revision,
        /// Reason given by the backend.
        reason: String,
        /// Whether the cache was rolled back to the authoritative copy.
        rolled_back: bool,
    },
    /// A remote change was applied to the cache.
    RemoteApplied {
        /// Collection of the change.
        collection: Collection,
        /// Document identifier.
        id: String,
    },
    /// A malformed remote document was quarantined.
    Quarantined {
        /// Collection of the document.
        collection: Collection,
        /// Document identifier.
        id: String,
        /// Validation failure.
        reason: String,
    },
}

struct Inspected {
    id: String,
    index_key: Option<String>,
    terminal: bool,
}

/// Reconciles the local cache with the remote document store.
///
/// Reads are always served from the cache. Writes are stored locally as
/// `pending` with a fresh revision and uploaded by [`flush_pending`]
/// (driven by the worker from [`spawn_flush_worker`]). Remote pushes enter
/// through [`apply_remote`]. Writes to one entity are serialised.
///
/// [`flush_pending`]: Self::flush_pending
/// [`spawn_flush_worker`]: Self::spawn_flush_worker
/// [`apply_remote`]: Self::apply_remote
pub struct SyncEngine {
    cache: Arc<dyn LocalCacheStore>,
    remote: Arc<dyn RemoteDocumentStore>,
    clock: SharedClock,
    settings: SyncSettings,
    revision: AtomicU64,
    entity_locks: KeyedLocks<(Collection, String)>,
    flush_guard: tokio::sync::Mutex<()>,
    flush_signal: Notify,
    connectivity: Notify,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Creates an engine over the given stores.
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCacheStore>,
        remote: Arc<dyn RemoteDocumentStore>,
        clock: SharedClock,
        settings: SyncSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache,
            remote,
            clock,
            settings,
            revision: AtomicU64::new(0),
            entity_locks: KeyedLocks::new(),
            flush_guard: tokio::sync::Mutex::new(()),
            flush_signal: Notify::new(),
            connectivity: Notify::new(),
            events,
        }
    }

    /// Returns the engine settings.
    #[must_use]
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Returns the local cache the engine writes through.
    #[must_use]
    pub fn cache(&self) -> Arc<dyn LocalCacheStore> {
        Arc::clone(&self.cache)
    }

    /// Recovers bookkeeping after a restart.
    ///
    /// Continues the revision counter past every cached revision and
    /// re-queues writes that were uploaded but never echoed back. Returns the
    /// number of queued writes.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache cannot be read or written.
    pub async fn init(&self) -> SyncResult<usize> {
        let mut queued = 0;
        for collection in Collection::ALL {
            for mut entry in self.entries(collection).await? {
                self.revision.fetch_max(entry.revision.value(), Ordering::SeqCst);
                if entry.state == EntryState::Sent {
                    entry.state = EntryState::Pending;
                    self.store_entry(&entry).await?;
                }
                if entry.state == EntryState::Pending {
                    queued += 1;
                }
            }
        }
        tracing::info!(queued, "sync engine initialised");
        if queued > 0 {
            self.flush_signal.notify_one();
        }
        Ok(queued)
    }

    /// Subscribes to sync notifications.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Reads a document from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails or holds an undecodable
    /// row.
    pub async fn read<T: SyncDocument>(&self, id: &str) -> SyncResult<Option<T>> {
        match self.entry(T::COLLECTION, id).await? {
            Some(entry) => decode(&entry).map(Some),
            None => Ok(None),
        }
    }

    /// Reads every cached document of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails or holds an undecodable
    /// row.
    pub async fn read_all<T: SyncDocument>(&self) -> SyncResult<Vec<T>> {
        self.entries(T::COLLECTION)
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    /// Reads the cached documents whose index key (owning job) matches.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails or holds an undecodable
    /// row.
    pub async fn find_by_index<T: SyncDocument>(&self, index_key: &str) -> SyncResult<Vec<T>> {
        let records = self
            .cache
            .find_by_index(CacheTable::from(T::COLLECTION), index_key)
            .await?;
        records
            .iter()
            .map(|record| decode_record(T::COLLECTION, record).and_then(|entry| decode(&entry)))
            .collect()
    }

    /// Returns the cache entry with its bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails or holds an undecodable
    /// row.
    pub async fn entry(&self, collection: Collection, id: &str) -> SyncResult<Option<CacheEntry>> {
        match self.cache.get(CacheTable::from(collection), id).await? {
            Some(record) => decode_record(collection, &record).map(Some),
            None => Ok(None),
        }
    }

    /// Writes a document locally and queues it for upload.
    ///
    /// The write is visible to [`read`](Self::read) as soon as this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Invalid`] when the document violates its schema,
    /// or [`SyncError`] when the cache fails.
    pub async fn write<T: SyncDocument>(&self, document: &T) -> SyncResult<WriteReceipt> {
        let id = document.document_id();
        let guard = self.entity_turn(T::COLLECTION, &id).await;
        let receipt = self.store_local(document).await?;
        drop(guard);
        self.flush_signal.notify_one();
        Ok(receipt)
    }

    /// Reads, changes and writes back one cached document in a single turn.
    ///
    /// No other write or remote push to the document can land between the
    /// read and the write. Returns `None` when the document is not cached;
    /// an error from `change` leaves the cache untouched.
    ///
    /// # Errors
    ///
    /// Returns the error of `change`, or [`SyncError`] (converted into `E`)
    /// when the cache fails or the new document violates its schema.
    pub async fn update<T, E, F>(&self, id: &str, change: F) -> Result<Option<Update<T>>, E>
    where
        T: SyncDocument,
        E: From<SyncError>,
        F: FnOnce(&T) -> Result<T, E>,
    {
        let guard = self.entity_turn(T::COLLECTION, id).await;
        let Some(entry) = self.entry(T::COLLECTION, id).await? else {
            return Ok(None);
        };
        let previous: T = decode(&entry)?;
        let current = change(&previous)?;
        let receipt = self.store_local(&current).await?;
        drop(guard);
        self.flush_signal.notify_one();
        Ok(Some(Update {
            previous,
            current,
            receipt,
        }))
    }

    /// Returns every write waiting for upload, oldest revision first.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails.
    pub async fn pending_entries(&self) -> SyncResult<Vec<CacheEntry>> {
        let mut pending = Vec::new();
        for collection in Collection::ALL {
            pending.extend(
                self.entries(collection)
                    .await?
                    .into_iter()
                    .filter(|entry| entry.state == EntryState::Pending),
            );
        }
        pending.sort_by_key(|entry| entry.revision);
        Ok(pending)
    }

    /// Uploads queued writes in revision order.
    ///
    /// Stops at the first transient failure and reports the remainder as
    /// deferred. A refused write is rolled back to the authoritative remote
    /// copy when one exists, otherwise it is marked rejected; either way a
    /// [`SyncEvent::WriteRejected`] is emitted and the write is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails.
    pub async fn flush_pending(&self) -> SyncResult<FlushReport> {
        let _flush = self.flush_guard.lock().await;
        let pending = self.pending_entries().await?;
        let total = pending.len();
        let mut report = FlushReport::default();

        for (index, entry) in pending.into_iter().enumerate() {
            match self.remote.put(entry.to_remote(self.settings.device_id)).await {
                Ok(()) => {
                    self.mark_sent(&entry).await?;
                    report.pushed += 1;
                }
                Err(RemoteStoreError::Rejected { reason, .. }) => {
                    self.handle_rejection(&entry, reason).await?;
                    report.rejected.push((entry.collection, entry.id.clone()));
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        collection = %entry.collection,
                        id = %entry.id,
                        "upload deferred"
                    );
                    report.deferred = total - index;
                    break;
                }
            }
        }

        if report.pushed > 0 || !report.rejected.is_empty() {
            tracing::info!(
                pushed = report.pushed,
                rejected = report.rejected.len(),
                deferred = report.deferred,
                "flushed upload queue"
            );
        }
        Ok(report)
    }

    /// Applies an authoritative document pushed by the remote store.
    ///
    /// Applying the same document twice leaves the cache unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails.
    pub async fn apply_remote(&self, document: RemoteDocument) -> SyncResult<RemoteOutcome> {
        let inspected = match inspect_remote(&document) {
            Ok(inspected) => inspected,
            Err(reason) => {
                self.quarantine(document, reason).await?;
                return Ok(RemoteOutcome::Quarantined);
            }
        };

        let _guard = self.entity_turn(document.collection, &document.id).await;
        let local = self.entry(document.collection, &document.id).await?;
        let resolution = resolve(local.as_ref(), &document, self.settings.device_id);

        let outcome = match (resolution, local) {
            (Resolution::ConfirmLocal, Some(mut entry)) => {
                if entry.state == EntryState::Confirmed {
                    RemoteOutcome::Unchanged
                } else {
                    entry.state = EntryState::Confirmed;
                    entry.rejection = None;
                    self.store_entry(&entry).await?;
                    RemoteOutcome::Confirmed
                }
            }
            (Resolution::KeepLocal, Some(entry)) => {
                tracing::debug!(
                    collection = %entry.collection,
                    id = %entry.id,
                    local_revision = %entry.revision,
                    "kept newer local write over remote push"
                );
                RemoteOutcome::KeptLocal
            }
            (_, Some(entry)) if is_same_copy(&entry, &document) => RemoteOutcome::Unchanged,
            (_, local) => {
                let outcome = if local.is_some() {
                    RemoteOutcome::Replaced
                } else {
                    RemoteOutcome::Inserted
                };
                let entry = CacheEntry {
                    collection: document.collection,
                    id: inspected.id,
                    index_key: inspected.index_key,
                    revision: self.next_revision(),
                    written_at: document.written_at,
                    state: EntryState::Confirmed,
                    terminal: inspected.terminal,
                    rejection: None,
                    body: document.body,
                };
                self.store_entry(&entry).await?;
                self.emit(SyncEvent::RemoteApplied {
                    collection: entry.collection,
                    id: entry.id,
                });
                outcome
            }
        };
        Ok(outcome)
    }

    /// Fetches a document from the remote store and applies it.
    ///
    /// Returns `None` when the remote store has no such document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when either store fails.
    pub async fn hydrate(
        &self,
        collection: Collection,
        id: &str,
    ) -> SyncResult<Option<RemoteOutcome>> {
        match self.remote.get(collection, id).await? {
            Some(document) => self.apply_remote(document).await.map(Some),
            None => Ok(None),
        }
    }

    /// Returns the quarantined remote documents.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails or holds an undecodable
    /// row.
    pub async fn quarantined(&self) -> SyncResult<Vec<QuarantinedDocument>> {
        self.cache
            .list(QuarantinedDocument::TABLE)
            .await?
            .into_iter()
            .map(|record| {
                serde_json::from_value(record.value).map_err(|err| SyncError::Decode {
                    collection: Collection::Jobs,
                    id: record.key,
                    reason: err.to_string(),
                })
            })
            .collect()
    }

    /// Signals that the network is back so queued writes upload without
    /// waiting out the current backoff delay.
    pub fn connectivity_restored(&self) {
        tracing::info!("connectivity restored");
        self.connectivity.notify_one();
        self.flush_signal.notify_one();
    }

    /// Removes entries older than the retention window that no longer need
    /// to stay cached: confirmed terminal entities, and writes the remote
    /// store refused without an authoritative copy to roll back to. Returns
    /// the number of evicted entries.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the cache fails.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> SyncResult<usize> {
        let retention = chrono::Duration::from_std(self.settings.retention)
            .unwrap_or(chrono::Duration::MAX);
        let is_expired = |entry: &CacheEntry| {
            let settled = match entry.state {
                EntryState::Confirmed => entry.terminal,
                EntryState::Rejected => true,
                EntryState::Pending | EntryState::Sent => false,
            };
            settled
                && entry
                    .written_at
                    .checked_add_signed(retention)
                    .is_some_and(|expiry| expiry <= now)
        };
        let mut evicted = 0;
        for collection in Collection::ALL {
            for listed in self.entries(collection).await? {
                if !is_expired(&listed) {
                    continue;
                }
                let _guard = self.entity_turn(collection, &listed.id).await;
                let still_expired = self
                    .entry(collection, &listed.id)
                    .await?
                    .is_some_and(|entry| is_expired(&entry));
                if still_expired
                    && self.cache.remove(CacheTable::from(collection), &listed.id).await?
                {
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            tracing::info!(evicted, "evicted expired cache entries");
        }
        Ok(evicted)
    }

    /// Spawns the background uploader.
    ///
    /// The worker flushes whenever a write is queued, backs off exponentially
    /// while the remote store is unreachable, and retries immediately after
    /// [`connectivity_restored`](Self::connectivity_restored).
    pub fn spawn_flush_worker(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut backoff = RetryBackoff::new(engine.settings.backoff);
            loop {
                let retry_in = match engine.flush_pending().await {
                    Ok(report) if report.is_complete() => {
                        backoff.reset();
                        None
                    }
                    Ok(_) => Some(backoff.next_delay()),
                    Err(err) => {
                        tracing::warn!(error = %err, "upload pass failed");
                        Some(backoff.next_delay())
                    }
                };
                match retry_in {
                    None => engine.flush_signal.notified().await,
                    Some(delay) => {
                        tracing::debug!(
                            ?delay,
                            attempts = backoff.attempts(),
                            "retrying upload later"
                        );
                        tokio::select! {
                            () = tokio::time::sleep(delay) => {}
                            () = engine.connectivity.notified() => backoff.reset(),
                        }
                    }
                }
            }
        })
    }

    /// Subscribes to remote pushes and applies them as they arrive.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when a subscription cannot be opened.
    pub async fn spawn_push_listener(
        self: &Arc<Self>,
        subscriptions: Vec<(Collection, SubscriptionFilter)>,
    ) -> SyncResult<JoinHandle<()>> {
        let mut streams = Vec::with_capacity(subscriptions.len());
        for (collection, filter) in subscriptions {
            streams.push(self.remote.subscribe(collection, filter).await?);
        }
        let engine = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let mut pushes = stream::select_all(streams);
            while let Some(document) = pushes.next().await {
                let collection = document.collection;
                let id = document.id.clone();
                if let Err(err) = engine.apply_remote(document).await {
                    tracing::warn!(error = %err, %collection, %id, "failed to apply remote push");
                }
            }
            tracing::info!("remote push streams ended");
        }))
    }

    async fn store_local<T: SyncDocument>(&self, document: &T) -> SyncResult<WriteReceipt> {
        let collection = T::COLLECTION;
        let id = document.document_id();
        document.validate().map_err(|reason| SyncError::Invalid {
            collection,
            id: id.clone(),
            reason,
        })?;
        let body = serde_json::to_value(document).map_err(|err| SyncError::Decode {
            collection,
            id: id.clone(),
            reason: err.to_string(),
        })?;
        let revision = self.next_revision();
        let entry = CacheEntry {
            collection,
            id: id.clone(),
            index_key: document.index_key(),
            revision,
            written_at: self.clock.utc(),
            state: EntryState::Pending,
            terminal: document.is_terminal(),
            rejection: None,
            body,
        };
        self.store_entry(&entry).await?;
        tracing::debug!(%collection, %id, %revision, "queued local write");
        Ok(WriteReceipt {
            collection,
            id,
            revision,
        })
    }

    async fn entries(&self, collection: Collection) -> SyncResult<Vec<CacheEntry>> {
        self.cache
            .list(CacheTable::from(collection))
            .await?
            .iter()
            .map(|record| decode_record(collection, record))
            .collect()
    }

    async fn store_entry(&self, entry: &CacheEntry) -> SyncResult<()> {
        let value = serde_json::to_value(entry).map_err(|err| SyncError::Decode {
            collection: entry.collection,
            id: entry.id.clone(),
            reason: err.to_string(),
        })?;
        let record = StoredRecord::new(entry.id.clone(), entry.index_key.clone(), value);
        self.cache
            .put(CacheTable::from(entry.collection), record)
            .await
            .map_err(SyncError::from)
    }

    async fn mark_sent(&self, uploaded: &CacheEntry) -> SyncResult<()> {
        let _guard = self.entity_turn(uploaded.collection, &uploaded.id).await;
        if let Some(mut entry) = self.entry(uploaded.collection, &uploaded.id).await? {
            if entry.revision == uploaded.revision && entry.state == EntryState::Pending {
                entry.state = EntryState::Sent;
                self.store_entry(&entry).await?;
            }
        }
        Ok(())
    }

    async fn handle_rejection(&self, refused: &CacheEntry, reason: String) -> SyncResult<()> {
        let authoritative = match self.remote.get(refused.collection, &refused.id).await {
            Ok(document) => document.filter(|document| inspect_remote(document).is_ok()),
            Err(err) => {
                tracing::warn!(error = %err, id = %refused.id, "cannot fetch authoritative copy");
                None
            }
        };

        let _guard = self.entity_turn(refused.collection, &refused.id).await;
        let Some(mut entry) = self.entry(refused.collection, &refused.id).await? else {
            return Ok(());
        };
        if entry.revision != refused.revision {
            return Ok(());
        }

        let rolled_back = if let Some(document) = authoritative {
            let inspected = inspect_remote(&document).ok();
            entry.body = document.body;
            entry.written_at = document.written_at;
            entry.state = EntryState::Confirmed;
            if let Some(inspected) = inspected {
                entry.index_key = inspected.index_key;
                entry.terminal = inspected.terminal;
            }
            true
        } else {
            entry.state = EntryState::Rejected;
            false
        };
        entry.rejection = Some(reason.clone());
        self.store_entry(&entry).await?;

        tracing::warn!(
            collection = %entry.collection,
            id = %entry.id,
            revision = %refused.revision,
            %reason,
            rolled_back,
            "remote store rejected local write"
        );
        self.emit(SyncEvent::WriteRejected {
            collection: entry.collection,
            id: entry.id,
            revision: refused.revision,
            reason,
            rolled_back,
        });
        Ok(())
    }

    async fn quarantine(&self, document: RemoteDocument, reason: String) -> SyncResult<()> {
        tracing::warn!(
            collection = %document.collection,
            id = %document.id,
            %reason,
            "quarantined malformed remote document"
        );
        let collection = document.collection;
        let id = document.id.clone();
        let quarantined = QuarantinedDocument {
            document,
            reason: reason.clone(),
            quarantined_at: self.clock.utc(),
        };
        let record = quarantined.to_record().map_err(|err| SyncError::Decode {
            collection,
            id: id.clone(),
            reason: err.to_string(),
        })?;
        self.cache.put(QuarantinedDocument::TABLE, record).await?;
        self.emit(SyncEvent::Quarantined {
            collection,
            id,
            reason,
        });
        Ok(())
    }

    fn next_revision(&self) -> Revision {
        Revision::new(self.revision.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn entity_turn(
        &self,
        collection: Collection,
        id: &str,
    ) -> KeyedGuard<(Collection, String)> {
        self.entity_locks.lock((collection, id.to_owned())).await
    }

    /// Returns the number of documents with a write running or waiting.
    #[cfg(test)]
    pub(crate) fn entity_turns_in_use(&self) -> usize {
        self.entity_locks.len()
    }

    fn emit(&self, event: SyncEvent) {
        let _receivers = self.events.send(event);
    }
}

fn decode_record(collection: Collection, record: &StoredRecord) -> SyncResult<CacheEntry> {
    serde_json::from_value(record.value.clone()).map_err(|err| SyncError::Decode {
        collection,
        id: record.key.clone(),
        reason: err.to_string(),
    })
}

fn decode<T: SyncDocument>(entry: &CacheEntry) -> SyncResult<T> {
    serde_json::from_value(entry.body.clone()).map_err(|err| SyncError::Decode {
        collection: entry.collection,
        id: entry.id.clone(),
        reason: err.to_string(),
    })
}

fn is_same_copy(entry: &CacheEntry, document: &RemoteDocument) -> bool {
    entry.state == EntryState::Confirmed
        && entry.written_at == document.written_at
        && entry.body == document.body
}

fn inspect<T: SyncDocument>(body: &Value) -> Result<Inspected, String> {
    let document: T = serde_json::from_value(body.clone()).map_err(|err| err.to_string())?;
    document.validate()?;
    Ok(Inspected {
        id: document.document_id(),
        index_key: document.index_key(),
        terminal: document.is_terminal(),
    })
}

fn inspect_remote(document: &RemoteDocument) -> Result<Inspected, String> {
    let inspected = match document.collection {
        Collection::Jobs => inspect::<Job>(&document.body),
        Collection::TrackingSessions => inspect::<TrackingSession>(&document.body),
        Collection::CheckIns => inspect::<CheckIn>(&document.body),
        Collection::EscalationAlerts => inspect::<EscalationAlert>(&document.body),
    }?;
    if inspected.id != document.id {
        return Err(format!(
            "body identifies {} but document id is {}",
            inspected.id, document.id
        ));
    }
    Ok(inspected)
}
