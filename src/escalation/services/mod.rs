//! Escalation orchestration.

mod monitor;

pub use monitor::{EscalationError, EscalationMonitor, EscalationResult, ResumeReport};
