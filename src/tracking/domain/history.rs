//! Bounded distance-to-target history.

use super::TrackingDomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Distance to the job site at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    /// Capture time of the reading.
    pub at: DateTime<Utc>,
    /// Great-circle distance to the target in meters.
    pub meters: f64,
}

/// Ring buffer of distance samples; the oldest sample is evicted once the
/// capacity is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceHistory {
    capacity: usize,
    samples: VecDeque<DistanceSample>,
}

impl DistanceHistory {
    /// Creates an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingDomainError::ZeroHistoryCapacity`] for a zero
    /// capacity.
    pub fn new(capacity: usize) -> Result<Self, TrackingDomainError> {
        if capacity == 0 {
            return Err(TrackingDomainError::ZeroHistoryCapacity);
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        })
    }

    /// Appends a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: DistanceSample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Returns the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns whether no sample has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&DistanceSample> {
        self.samples.back()
    }

    /// Iterates samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &DistanceSample> {
        self.samples.iter()
    }
}
