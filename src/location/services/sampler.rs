//! Restartable position sampling stream.

use crate::location::{
    domain::PositionReading,
    ports::{LocationProvider, LocationProviderError},
};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Interval, MissedTickBehavior};

/// Stream of position readings produced by [`PositionSampler::start`].
pub type PositionStream = BoxStream<'static, SamplerResult<PositionReading>>;

/// Result type for sampler operations.
pub type SamplerResult<T> = Result<T, SamplerError>;

/// Errors surfaced by the position sampler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SamplerError {
    /// Location access is denied; the stream ends after yielding this.
    #[error("location permission denied")]
    PermissionDenied,

    /// A single read did not complete within the timeout.
    #[error("position read timed out after {0:?}")]
    Timeout(Duration),

    /// No position could be obtained right now.
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

/// Wraps a [`LocationProvider`] into an interval-driven reading stream.
///
/// The stream is lazy: a read is only issued when the consumer polls, and
/// ticks missed while the consumer is busy are skipped rather than queued,
/// so a slow consumer never sees stale readings. Transient read failures are
/// logged and retried on the next tick. Permission denial is yielded once as
/// a terminal error.
pub struct PositionSampler {
    provider: Arc<dyn LocationProvider>,
    stop: Mutex<Option<watch::Sender<bool>>>,
}

struct SamplingState {
    provider: Arc<dyn LocationProvider>,
    ticker: Interval,
    stop: watch::Receiver<bool>,
    finished: bool,
}

impl PositionSampler {
    /// Creates an idle sampler.
    #[must_use]
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            stop: Mutex::new(None),
        }
    }

    /// Starts sampling every `interval` and returns the reading stream.
    ///
    /// Calling `start` while a stream is live stops that stream first;
    /// calling it after [`stop`](Self::stop) resumes sampling.
    pub fn start(&self, interval: Duration) -> PositionStream {
        let (stop_tx, stop_rx) = watch::channel(false);
        if let Ok(mut slot) = self.stop.lock() {
            if let Some(previous) = slot.replace(stop_tx) {
                let _ignored = previous.send(true);
            }
        }

        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let state = SamplingState {
            provider: Arc::clone(&self.provider),
            ticker,
            stop: stop_rx,
            finished: false,
        };
        stream::unfold(state, next_reading).boxed()
    }

    /// Stops the live stream, if any. Idempotent.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.stop.lock() {
            if let Some(sender) = slot.take() {
                let _ignored = sender.send(true);
            }
        }
    }

    /// Returns whether a stream is currently live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stop
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|sender| !sender.is_closed()))
            .unwrap_or(false)
    }

    /// Requests a single reading bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError::PermissionDenied`], [`SamplerError::Timeout`]
    /// or [`SamplerError::Unavailable`] for the corresponding failures.
    pub async fn current_position(&self, timeout: Duration) -> SamplerResult<PositionReading> {
        match tokio::time::timeout(timeout, self.provider.read_position()).await {
            Err(_elapsed) => Err(SamplerError::Timeout(timeout)),
            Ok(Ok(reading)) => Ok(reading),
            Ok(Err(LocationProviderError::PermissionDenied)) => Err(SamplerError::PermissionDenied),
            Ok(Err(err)) => Err(SamplerError::Unavailable(err.to_string())),
        }
    }
}

impl Drop for PositionSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn next_reading(
    mut state: SamplingState,
) -> Option<(SamplerResult<PositionReading>, SamplingState)> {
    if state.finished || *state.stop.borrow() {
        return None;
    }
    loop {
        tokio::select! {
            biased;
            _ = state.stop.changed() => return None,
            _ = state.ticker.tick() => {}
        }
        match state.provider.read_position().await {
            Ok(reading) => return Some((Ok(reading), state)),
            Err(LocationProviderError::PermissionDenied) => {
                tracing::warn!("location permission denied, ending sampling stream");
                state.finished = true;
                return Some((Err(SamplerError::PermissionDenied), state));
            }
            Err(err) => {
                tracing::debug!(
                    error = %err,
                    "transient position read failure, retrying next tick"
                );
            }
        }
    }
}
