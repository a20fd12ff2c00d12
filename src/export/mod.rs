//! Two-phase export hand-off.
//!
//! Completed tasks are first staged into a batch-scoped container in the
//! staging area and later delivered into a client destination. Each task's
//! export status is checkpointed after every copy attempt, progress is
//! mirrored into the keyed property store, and the recovery service can
//! resume or reset anything a crash leaves behind.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{ExportError, ExportResult, SessionError, SessionResult};

#[cfg(test)]
mod tests;
