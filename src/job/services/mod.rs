//! Job lifecycle orchestration services.

mod lifecycle;

pub use lifecycle::{
    JobLifecycleDeps, JobLifecycleError, JobLifecycleResult, JobLifecycleService, StartOutcome,
};
