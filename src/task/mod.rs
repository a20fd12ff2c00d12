//! Task lifecycle management.
//!
//! Owns the work-status and review-status transitions of a task and its
//! append-only revision ledger. Export fields live on the same aggregate but
//! are only driven by the [`crate::export`] services. The module follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
