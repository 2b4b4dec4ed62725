//! Adapter implementations for location ports.

pub mod memory;

pub use memory::{ScriptedFix, ScriptedLocationProvider, StaticGeocoder};
