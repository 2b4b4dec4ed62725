//! Pure location types and geofence math.

mod coordinate;
mod error;
mod geofence;
mod reading;

pub use coordinate::Coordinate;
pub use error::LocationDomainError;
pub use geofence::{ArrivalRadius, EARTH_RADIUS_METERS, GeofenceClassification, classify, distance_meters};
pub use reading::PositionReading;
