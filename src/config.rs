//! Engine configuration.
//!
//! Every tunable has a product default, so an empty JSON object is a valid
//! configuration. Durations are expressed in whole seconds.

use crate::checkin::services::CheckInSettings;
use crate::escalation::domain::{DeadlineAnchor, EscalationPolicy};
use crate::location::domain::ArrivalRadius;
use crate::sync::domain::{BackoffPolicy, DeviceId};
use crate::sync::services::SyncSettings;
use crate::tracking::services::TrackingSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for this schema.
    #[error("invalid configuration document: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// Why the value was refused.
        reason: &'static str,
    },
}

/// Location sampling and geofence tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationConfig {
    /// Geofence radius for arrival detection, in meters.
    pub arrival_radius_meters: f64,
    /// Interval between tracking samples.
    pub sampling_interval_secs: u64,
    /// Capacity of each session's distance history.
    pub history_capacity: usize,
    /// Check-in position timeout.
    pub position_timeout_secs: u64,
    /// Reverse-geocoding timeout.
    pub geocode_timeout_secs: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            arrival_radius_meters: ArrivalRadius::DEFAULT.meters(),
            sampling_interval_secs: 15,
            history_capacity: 200,
            position_timeout_secs: 10,
            geocode_timeout_secs: 5,
        }
    }
}

/// Missed-check-in escalation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscalationConfig {
    /// Grace period before a missed check-in escalates.
    pub grace_period_secs: u64,
    /// Instant the grace period is measured from.
    pub anchor: DeadlineAnchor,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10 * 60,
            anchor: DeadlineAnchor::Acceptance,
        }
    }
}

/// Synchronisation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Device identifier stamped on uploads; random when absent.
    pub device_id: Option<Uuid>,
    /// First retry delay.
    pub backoff_base_secs: u64,
    /// Retry delay multiplier.
    pub backoff_factor: u32,
    /// Maximum retry delay.
    pub backoff_cap_secs: u64,
    /// How long confirmed terminal entities stay cached.
    pub retention_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            backoff_base_secs: 1,
            backoff_factor: 2,
            backoff_cap_secs: 60,
            retention_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldTrackConfig {
    /// Location tunables.
    pub location: LocationConfig,
    /// Escalation tunables.
    pub escalation: EscalationConfig,
    /// Sync tunables.
    pub sync: SyncConfig,
}

/// Validated settings for every engine component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Tracking session settings.
    pub tracking: TrackingSettings,
    /// Check-in settings.
    pub check_in: CheckInSettings,
    /// Escalation policy.
    pub escalation: EscalationPolicy,
    /// Sync engine settings.
    pub sync: SyncSettings,
}

impl FieldTrackConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::InvalidValue`] for out-of-range values.
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let location = &self.location;
        ensure(
            ArrivalRadius::new(location.arrival_radius_meters).is_ok(),
            "location.arrival_radius_meters",
            "must be a positive number",
        )?;
        ensure(
            location.sampling_interval_secs > 0,
            "location.sampling_interval_secs",
            "must be positive",
        )?;
        ensure(
            location.history_capacity > 0,
            "location.history_capacity",
            "must be positive",
        )?;
        ensure(
            location.position_timeout_secs > 0,
            "location.position_timeout_secs",
            "must be positive",
        )?;
        ensure(
            location.geocode_timeout_secs > 0,
            "location.geocode_timeout_secs",
            "must be positive",
        )?;
        ensure(
            self.escalation.grace_period_secs > 0,
            "escalation.grace_period_secs",
            "must be positive",
        )?;
        let sync = &self.sync;
        ensure(sync.backoff_base_secs > 0, "sync.backoff_base_secs", "must be positive")?;
        ensure(sync.backoff_factor >= 1, "sync.backoff_factor", "must be at least 1")?;
        ensure(
            sync.backoff_cap_secs >= sync.backoff_base_secs,
            "sync.backoff_cap_secs",
            "must not be below the base delay",
        )?;
        ensure(sync.retention_secs > 0, "sync.retention_secs", "must be positive")
    }

    /// Converts the configuration into component settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when validation fails.
    pub fn settings(&self) -> Result<EngineSettings, ConfigError> {
        self.validate()?;
        let location = &self.location;
        let arrival_radius = ArrivalRadius::new(location.arrival_radius_meters).map_err(|_| {
            ConfigError::InvalidValue {
                field: "location.arrival_radius_meters",
                reason: "must be a positive number",
            }
        })?;
        Ok(EngineSettings {
            tracking: TrackingSettings {
                sampling_interval: Duration::from_secs(location.sampling_interval_secs),
                history_capacity: location.history_capacity,
                arrival_radius,
            },
            check_in: CheckInSettings {
                position_timeout: Duration::from_secs(location.position_timeout_secs),
                geocode_timeout: Duration::from_secs(location.geocode_timeout_secs),
            },
            escalation: EscalationPolicy {
                grace: Duration::from_secs(self.escalation.grace_period_secs),
                anchor: self.escalation.anchor,
            },
            sync: SyncSettings {
                device_id: self.sync.device_id.map_or_else(DeviceId::new, DeviceId::from_uuid),
                backoff: BackoffPolicy {
                    base: Duration::from_secs(self.sync.backoff_base_secs),
                    factor: self.sync.backoff_factor,
                    cap: Duration::from_secs(self.sync.backoff_cap_secs),
                },
                retention: Duration::from_secs(self.sync.retention_secs),
            },
        })
    }
}

const fn ensure(
    condition: bool,
    field: &'static str,
    reason: &'static str,
) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, reason })
    }
}
