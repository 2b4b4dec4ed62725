//! Device location access and geofence evaluation.
//!
//! The location context wraps the platform position API behind the
//! [`ports::LocationProvider`] contract, turns single reads into a
//! restartable sampling stream ([`services::PositionSampler`]) and provides
//! pure great-circle geofence classification ([`domain::distance_meters`],
//! [`domain::classify`]).

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
