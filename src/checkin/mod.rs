//! Check-in capture at job start.
//!
//! The [`services::CheckInCoordinator`] turns a single bounded position read
//! into an immutable [`domain::CheckIn`], persists it optimistically and
//! announces it to interested components.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
