//! Escalation alert record.

use crate::job::domain::{JobId, StaffId};
use crate::sync::domain::{Collection, SyncDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of an escalation alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Creates a new random alert identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an alert was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertResolution {
    /// Still open.
    Unresolved,
    /// The staff member showed up after the deadline.
    AutoResolvedByArrival,
    /// An administrator acknowledged the alert.
    ManuallyAcknowledged,
    /// The job was completed.
    ResolvedByCompletion,
}

impl AlertResolution {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::AutoResolvedByArrival => "auto_resolved_by_arrival",
            Self::ManuallyAcknowledged => "manually_acknowledged",
            Self::ResolvedByCompletion => "resolved_by_completion",
        }
    }
}

impl fmt::Display for AlertResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AlertResolution {
    type Error = ParseAlertResolutionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unresolved" => Ok(Self::Unresolved),
            "auto_resolved_by_arrival" => Ok(Self::AutoResolvedByArrival),
            "manually_acknowledged" => Ok(Self::ManuallyAcknowledged),
            "resolved_by_completion" => Ok(Self::ResolvedByCompletion),
            _ => Err(ParseAlertResolutionError(value.to_owned())),
        }
    }
}

/// Error returned while parsing alert resolutions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown alert resolution: {0}")]
pub struct ParseAlertResolutionError(pub String);

/// Record of a missed check-in deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationAlert {
    id: AlertId,
    job_id: JobId,
    staff_id: StaffId,
    deadline: DateTime<Utc>,
    fired_at: DateTime<Utc>,
    resolution: AlertResolution,
    resolved_at: Option<DateTime<Utc>>,
}

impl EscalationAlert {
    /// Creates an unresolved alert.
    #[must_use]
    pub fn fire(
        job_id: JobId,
        staff_id: StaffId,
        deadline: DateTime<Utc>,
        fired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(),
            job_id,
            staff_id,
            deadline,
            fired_at,
            resolution: AlertResolution::Unresolved,
            resolved_at: None,
        }
    }

    /// Returns the alert identifier.
    #[must_use]
    pub const fn id(&self) -> AlertId {
        self.id
    }

    /// Returns the job whose deadline was missed.
    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Returns the staff member who missed the deadline.
    #[must_use]
    pub const fn staff_id(&self) -> &StaffId {
        &self.staff_id
    }

    /// Returns the missed deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns when the alert fired.
    #[must_use]
    pub const fn fired_at(&self) -> DateTime<Utc> {
        self.fired_at
    }

    /// Returns the resolution.
    #[must_use]
    pub const fn resolution(&self) -> AlertResolution {
        self.resolution
    }

    /// Returns when the alert was resolved.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Returns whether the alert is still open.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self.resolution, AlertResolution::Unresolved)
    }

    /// Resolves an open alert. Returns `false` if it was already resolved or
    /// `resolution` is [`AlertResolution::Unresolved`].
    pub const fn resolve(&mut self, resolution: AlertResolution, at: DateTime<Utc>) -> bool {
        if !self.is_unresolved() || matches!(resolution, AlertResolution::Unresolved) {
            return false;
        }
        self.resolution = resolution;
        self.resolved_at = Some(at);
        true
    }
}

impl SyncDocument for EscalationAlert {
    const COLLECTION: Collection = Collection::EscalationAlerts;

    fn document_id(&self) -> String {
        self.id.to_string()
    }

    fn index_key(&self) -> Option<String> {
        Some(self.job_id.to_string())
    }

    fn is_terminal(&self) -> bool {
        !self.is_unresolved()
    }

    fn validate(&self) -> Result<(), String> {
        if self.is_unresolved() != self.resolved_at.is_none() {
            return Err("resolution and resolved_at disagree".to_owned());
        }
        Ok(())
    }
}
