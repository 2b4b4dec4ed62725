//! Background tracking sessions with edge-triggered arrival detection.
//!
//! A [`domain::TrackingSession`] is opened when a job starts, fed by a
//! [`crate::location::services::PositionSampler`] subscription while active
//! and closed when the job completes or tracking is stopped explicitly.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
