//! Check-in record and failure taxonomy.

mod check_in;
mod error;

pub use check_in::{CheckIn, CheckInId};
pub use error::CheckInError;
