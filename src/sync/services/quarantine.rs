//! Storage shape of malformed remote documents.

use crate::sync::{
    domain::{CacheTable, RemoteDocument},
    ports::StoredRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remote document that failed schema validation and was set aside
/// instead of being applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedDocument {
    /// The document as received.
    pub document: RemoteDocument,
    /// Why it was refused.
    pub reason: String,
    /// When it was set aside.
    pub quarantined_at: DateTime<Utc>,
}

impl QuarantinedDocument {
    pub(super) const TABLE: CacheTable = CacheTable::Quarantine;

    pub(super) fn key(&self) -> String {
        format!("{}/{}", self.document.collection, self.document.id)
    }

    pub(super) fn to_record(&self) -> Result<StoredRecord, serde_json::Error> {
        Ok(StoredRecord::new(
            self.key(),
            Some(self.document.collection.as_str().to_owned()),
            serde_json::to_value(self)?,
        ))
    }
}
