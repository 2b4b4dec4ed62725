//! Offline-first synchronisation between the local cache and the remote
//! document store.
//!
//! Every job, tracking session, check-in and escalation alert is read from
//! and written to the [`services::SyncEngine`]. Writes land in the local
//! cache immediately with a fresh local revision and are queued for upload;
//! authoritative remote pushes are reconciled against the cache with a
//! last-writer-wins policy in which the remote side wins ties.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
