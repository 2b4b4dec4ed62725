//! Job lifecycle state machine.
//!
//! Jobs move along `pending → assigned → accepted → in_progress →
//! completed`, with `assigned|accepted → rejected` and any non-terminal
//! state `→ cancelled`. All transitions go through the pure
//! [`domain::apply_transition`]; persistence and side effects (check-in,
//! tracking, escalation) are orchestrated by [`services::JobLifecycleService`].

pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
