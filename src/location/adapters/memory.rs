//! Scripted in-memory location adapters for tests and simulations.

use crate::collaborators::SharedClock;
use crate::location::{
    domain::{Coordinate, PositionReading},
    ports::{
        GeocodeError, LocationPermission, LocationProvider, LocationProviderError,
        LocationProviderResult, ReverseGeocoder,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// One scripted outcome of a position read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedFix {
    /// A fix at the coordinate with the given accuracy in meters.
    At(Coordinate, f64),
    /// No signal for this read.
    NoSignal,
}

/// Location provider that replays a script of fixes.
///
/// Once the script is exhausted the provider keeps reporting the last
/// scripted coordinate, or no signal if none was ever scripted. Every read is
/// a fresh fix: when the clock has not moved since the previous read, the
/// capture time advances by one millisecond.
/// [`replay_last_fix`](Self::replay_last_fix) repeats a cached fix instead.
#[derive(Clone)]
pub struct ScriptedLocationProvider {
    state: Arc<RwLock<ScriptedState>>,
    clock: SharedClock,
}

#[derive(Debug)]
struct ScriptedState {
    permission: LocationPermission,
    script: VecDeque<ScriptedFix>,
    last_fix: Option<(Coordinate, f64)>,
    read_delay: Option<Duration>,
    reads: usize,
    last_reading: Option<PositionReading>,
    replay_next: bool,
}

impl ScriptedLocationProvider {
    /// Creates a provider with permission granted and an empty script.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            state: Arc::new(RwLock::new(ScriptedState {
                permission: LocationPermission::Granted,
                script: VecDeque::new(),
                last_fix: None,
                read_delay: None,
                reads: 0,
                last_reading: None,
                replay_next: false,
            })),
            clock,
        }
    }

    /// Sets the permission state.
    pub fn set_permission(&self, permission: LocationPermission) {
        if let Ok(mut state) = self.state.write() {
            state.permission = permission;
        }
    }

    /// Appends fixes to the script.
    pub fn push_fixes(&self, fixes: impl IntoIterator<Item = ScriptedFix>) {
        if let Ok(mut state) = self.state.write() {
            state.script.extend(fixes);
        }
    }

    /// Delays every read, used to exercise read timeouts.
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        if let Ok(mut state) = self.state.write() {
            state.read_delay = delay;
        }
    }

    /// Returns the number of reads served so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.state.read().map(|state| state.reads).unwrap_or_default()
    }

    /// Makes the next read return the previous reading unchanged, as a
    /// platform does when it serves a cached fix.
    pub fn replay_last_fix(&self) {
        if let Ok(mut state) = self.state.write() {
            state.replay_next = true;
        }
    }

    fn next_reading(&self, now: DateTime<Utc>) -> LocationProviderResult<PositionReading> {
        let mut state = self.state.write().map_err(|err| {
            LocationProviderError::platform(std::io::Error::other(err.to_string()))
        })?;
        if state.permission != LocationPermission::Granted {
            return Err(LocationProviderError::PermissionDenied);
        }
        state.reads += 1;
        if std::mem::take(&mut state.replay_next) {
            if let Some(cached) = state.last_reading {
                return Ok(cached);
            }
        }
        let (coordinate, accuracy) = match state.script.pop_front() {
            Some(ScriptedFix::At(coordinate, accuracy)) => {
                state.last_fix = Some((coordinate, accuracy));
                (coordinate, accuracy)
            }
            Some(ScriptedFix::NoSignal) => return Err(LocationProviderError::NoSignal),
            None => state.last_fix.ok_or(LocationProviderError::NoSignal)?,
        };
        let captured_at = match state.last_reading {
            Some(previous) if now <= previous.captured_at() => {
                previous.captured_at() + TimeDelta::milliseconds(1)
            }
            _ => now,
        };
        let reading = PositionReading::new(coordinate, accuracy, captured_at)
            .map_err(LocationProviderError::platform)?;
        state.last_reading = Some(reading);
        Ok(reading)
    }

    fn read_delay(&self) -> Option<Duration> {
        self.state.read().ok().and_then(|state| state.read_delay)
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn permission(&self) -> LocationPermission {
        self.state
            .read()
            .map(|state| state.permission)
            .unwrap_or(LocationPermission::Undetermined)
    }

    async fn read_position(&self) -> LocationProviderResult<PositionReading> {
        if let Some(delay) = self.read_delay() {
            tokio::time::sleep(delay).await;
        }
        self.next_reading(self.clock.utc())
    }
}

/// Geocoder returning a fixed address, or failing when none is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    address: Option<String>,
}

impl StaticGeocoder {
    /// Creates a geocoder that resolves every coordinate to `address`.
    #[must_use]
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
        }
    }

    /// Creates a geocoder that never resolves an address.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self { address: None }
    }
}

#[async_trait]
impl ReverseGeocoder for StaticGeocoder {
    async fn reverse_geocode(&self, _coordinate: Coordinate) -> Result<String, GeocodeError> {
        self.address
            .clone()
            .ok_or_else(|| GeocodeError::Unavailable("no geocoder configured".to_owned()))
    }
}
