//! Port contracts for platform location services.

pub mod geocoder;
pub mod provider;

pub use geocoder::{GeocodeError, ReverseGeocoder};
pub use provider::{LocationPermission, LocationProvider, LocationProviderError, LocationProviderResult};
