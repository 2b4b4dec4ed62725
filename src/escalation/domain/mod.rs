//! Escalation alerts, persisted deadlines and deadline policy.

mod alert;
mod deadline;
mod policy;

pub use alert::{AlertId, AlertResolution, EscalationAlert, ParseAlertResolutionError};
pub use deadline::PendingDeadline;
pub use policy::{DeadlineAnchor, EscalationPolicy};
