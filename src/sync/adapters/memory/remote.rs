//! In-memory remote document store with connectivity simulation.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::sync::{
    domain::{Collection, RemoteDocument, SubscriptionFilter},
    ports::{RemoteDocumentStore, RemoteDocumentStream, RemoteStoreError, RemoteStoreResult},
};

const PUSH_CAPACITY: usize = 256;

type DocumentKey = (Collection, String);

/// Remote store kept in memory.
///
/// Accepted writes are pushed to every subscriber, including the writer, in
/// the way a real-time backend echoes changes. A server-side guard refuses
/// writes older than the stored copy.
#[derive(Debug, Clone)]
pub struct InMemoryRemoteStore {
    state: Arc<RwLock<RemoteState>>,
    pushes: broadcast::Sender<RemoteDocument>,
}

#[derive(Debug)]
struct RemoteState {
    documents: HashMap<DocumentKey, RemoteDocument>,
    rejections: HashMap<DocumentKey, String>,
    online: bool,
    accepted_puts: usize,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    /// Creates an empty, online store.
    #[must_use]
    pub fn new() -> Self {
        let (pushes, _) = broadcast::channel(PUSH_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(RemoteState {
                documents: HashMap::new(),
                rejections: HashMap::new(),
                online: true,
                accepted_puts: 0,
            })),
            pushes,
        }
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_online(&self, online: bool) {
        if let Ok(mut state) = self.state.write() {
            state.online = online;
        }
    }

    /// Makes the next write of the document fail validation.
    pub fn reject_next_put(
        &self,
        collection: Collection,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) {
        if let Ok(mut state) = self.state.write() {
            state.rejections.insert((collection, id.into()), reason.into());
        }
    }

    /// Stores and pushes a document written by another device.
    pub fn push_external(&self, document: RemoteDocument) {
        if let Ok(mut state) = self.state.write() {
            state
                .documents
                .insert((document.collection, document.id.clone()), document.clone());
        }
        let _receivers = self.pushes.send(document);
    }

    /// Returns the stored copy of a document.
    #[must_use]
    pub fn document(&self, collection: Collection, id: &str) -> Option<RemoteDocument> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.documents.get(&(collection, id.to_owned())).cloned())
    }

    /// Returns how many writes were accepted.
    #[must_use]
    pub fn accepted_puts(&self) -> usize {
        self.state
            .read()
            .map(|state| state.accepted_puts)
            .unwrap_or_default()
    }

    fn state_error(err: impl std::fmt::Display) -> RemoteStoreError {
        RemoteStoreError::transport(std::io::Error::other(err.to_string()))
    }
}

#[async_trait]
impl RemoteDocumentStore for InMemoryRemoteStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> RemoteStoreResult<Option<RemoteDocument>> {
        let state = self.state.read().map_err(Self::state_error)?;
        if !state.online {
            return Err(RemoteStoreError::Unavailable("offline".to_owned()));
        }
        Ok(state.documents.get(&(collection, id.to_owned())).cloned())
    }

    async fn put(&self, document: RemoteDocument) -> RemoteStoreResult<()> {
        {
            let mut state = self.state.write().map_err(Self::state_error)?;
            if !state.online {
                return Err(RemoteStoreError::Unavailable("offline".to_owned()));
            }
            let key = (document.collection, document.id.clone());
            if let Some(reason) = state.rejections.remove(&key) {
                return Err(RemoteStoreError::Rejected {
                    collection: document.collection,
                    id: document.id,
                    reason,
                });
            }
            if let Some(stored) = state.documents.get(&key) {
                if stored.written_at > document.written_at {
                    return Err(RemoteStoreError::Rejected {
                        collection: document.collection,
                        id: document.id,
                        reason: format!("stale write, stored copy is from {}", stored.written_at),
                    });
                }
            }
            state.documents.insert(key, document.clone());
            state.accepted_puts += 1;
        }
        let _receivers = self.pushes.send(document);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: Collection,
        filter: SubscriptionFilter,
    ) -> RemoteStoreResult<RemoteDocumentStream> {
        let receiver = self.pushes.subscribe();
        let pushes = stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(document) => return Some((document, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "remote push subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(pushes
            .filter(move |document| {
                future::ready(document.collection == collection && filter.matches(&document.body))
            })
            .boxed())
    }
}
