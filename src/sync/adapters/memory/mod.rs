//! In-memory adapters for tests and local simulation.

mod cache;
mod remote;

pub use cache::InMemoryCacheStore;
pub use remote::InMemoryRemoteStore;
