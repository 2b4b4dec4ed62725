//! Missed-check-in escalation.
//!
//! Every job that enters `accepted` gets a deadline persisted in the
//! `pending_deadlines` table. The [`services::EscalationMonitor`] arms an
//! in-process timer for it and, after a restart, re-arms or immediately
//! fires deadlines recovered from the cache.

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
