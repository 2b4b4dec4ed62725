//! Remote document shape and subscription filters.

use super::{Collection, Revision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the device that produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Creates a new random device identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a device identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marks which device and local revision produced a remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriteOrigin {
    /// Writing device.
    pub device_id: DeviceId,
    /// Local revision on that device.
    pub revision: Revision,
}

/// A document as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Owning collection.
    pub collection: Collection,
    /// Document identifier.
    pub id: String,
    /// Wall-clock timestamp attached to the write.
    pub written_at: DateTime<Utc>,
    /// Device that produced the write, if known.
    pub origin: Option<WriteOrigin>,
    /// Document body.
    pub body: serde_json::Value,
}

/// Server-side filter for push subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionFilter {
    /// Every document of the collection.
    All,
    /// Documents whose top-level string field equals `value`.
    FieldEquals {
        /// Field name.
        field: String,
        /// Expected value.
        value: String,
    },
}

impl SubscriptionFilter {
    /// Creates a field equality filter.
    #[must_use]
    pub fn field_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns whether the document body passes the filter.
    #[must_use]
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        match self {
            Self::All => true,
            Self::FieldEquals { field, value } => body
                .get(field)
                .and_then(serde_json::Value::as_str)
                .is_some_and(|actual| actual == value),
        }
    }
}
