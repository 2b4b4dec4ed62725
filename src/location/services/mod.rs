//! Location services built on top of the platform port.

mod sampler;

pub use sampler::{PositionSampler, PositionStream, SamplerError, SamplerResult};
