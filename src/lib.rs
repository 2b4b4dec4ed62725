//! Fieldtrack: job lifecycle and field-presence tracking engine.
//!
//! The engine drives a field job from assignment to completion while
//! capturing where staff actually are: a check-in when work starts, a
//! sampled tracking session that detects arrival on site, and an
//! escalation when an accepted job sees no check-in in time. Every entity
//! is written to a local cache first and reconciled with a remote document
//! store in the background, so the engine keeps working offline.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (memory, files)
//! - **Services**: Orchestration over ports
//!
//! # Modules
//!
//! - [`job`]: Job state machine and lifecycle orchestration
//! - [`location`]: Position sampling and geofence evaluation
//! - [`checkin`]: Check-in capture at job start
//! - [`tracking`]: Tracking sessions and arrival detection
//! - [`escalation`]: Missed-check-in deadlines and alerts
//! - [`sync`]: Offline-first cache and remote reconciliation
//! - [`collaborators`]: Identity, notification and clock contracts
//! - [`config`]: Tunables and their defaults
//! - [`engine`]: Composition root with explicit `init` and `shutdown`

pub mod checkin;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod escalation;
pub mod job;
pub mod location;
pub mod sync;
pub mod tracking;

#[cfg(test)]
mod test_support;
