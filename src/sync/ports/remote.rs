//! Narrow contract for the remote authoritative document store.

use crate::sync::domain::{Collection, RemoteDocument, SubscriptionFilter};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Result type for remote store operations.
pub type RemoteStoreResult<T> = Result<T, RemoteStoreError>;

/// Stream of authoritative documents pushed by the backend.
pub type RemoteDocumentStream = BoxStream<'static, RemoteDocument>;

/// Remote document store used by the sync engine and nothing else.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetches a document.
    async fn get(&self, collection: Collection, id: &str) -> RemoteStoreResult<Option<RemoteDocument>>;

    /// Writes a document.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteStoreError::Rejected`] when a server-side guard refuses
    /// the write; retrying such a write cannot succeed.
    async fn put(&self, document: RemoteDocument) -> RemoteStoreResult<()>;

    /// Subscribes to authoritative updates of a collection.
    async fn subscribe(
        &self,
        collection: Collection,
        filter: SubscriptionFilter,
    ) -> RemoteStoreResult<RemoteDocumentStream>;
}

/// Errors returned by remote store adapters.
#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    /// The backend cannot be reached; retry later.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// A server-side guard refused the write.
    #[error("remote store rejected {collection}/{id}: {reason}")]
    Rejected {
        /// Collection of the refused write.
        collection: Collection,
        /// Document identifier.
        id: String,
        /// Reason given by the backend.
        reason: String,
    },

    /// Transport-level failure; retry later.
    #[error("remote transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl RemoteStoreError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns whether retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}
