//! Remote collections and local cache tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remote document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Job records.
    Jobs,
    /// Tracking sessions.
    TrackingSessions,
    /// Check-in records.
    CheckIns,
    /// Escalation alerts.
    EscalationAlerts,
}

impl Collection {
    /// Every synchronised collection.
    pub const ALL: [Self; 4] = [
        Self::Jobs,
        Self::TrackingSessions,
        Self::CheckIns,
        Self::EscalationAlerts,
    ];

    /// Returns the canonical collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::TrackingSessions => "tracking_sessions",
            Self::CheckIns => "check_ins",
            Self::EscalationAlerts => "escalation_alerts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Collection {
    type Error = ParseCollectionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == value.trim())
            .ok_or_else(|| ParseCollectionError(value.to_owned()))
    }
}

/// Error returned while parsing collection names.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown collection: {0}")]
pub struct ParseCollectionError(pub String);

/// Logical table of the local cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTable {
    /// Cached jobs keyed by job id.
    Jobs,
    /// Cached tracking sessions keyed by session id, indexed by job id.
    TrackingSessions,
    /// Cached check-ins keyed by check-in id, indexed by job id.
    CheckIns,
    /// Cached escalation alerts keyed by alert id, indexed by job id.
    EscalationAlerts,
    /// Escalation deadlines awaiting their timer, keyed by job id.
    PendingDeadlines,
    /// Malformed remote records set aside for inspection.
    Quarantine,
}

impl CacheTable {
    /// Every local table.
    pub const ALL: [Self; 6] = [
        Self::Jobs,
        Self::TrackingSessions,
        Self::CheckIns,
        Self::EscalationAlerts,
        Self::PendingDeadlines,
        Self::Quarantine,
    ];

    /// Returns the canonical table name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::TrackingSessions => "tracking_sessions",
            Self::CheckIns => "check_ins",
            Self::EscalationAlerts => "escalation_alerts",
            Self::PendingDeadlines => "pending_deadlines",
            Self::Quarantine => "quarantine",
        }
    }
}

impl From<Collection> for CacheTable {
    fn from(value: Collection) -> Self {
        match value {
            Collection::Jobs => Self::Jobs,
            Collection::TrackingSessions => Self::TrackingSessions,
            Collection::CheckIns => Self::CheckIns,
            Collection::EscalationAlerts => Self::EscalationAlerts,
        }
    }
}

impl fmt::Display for CacheTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
