//! Stagehand: production task lifecycle and export hand-off.
//!
//! This crate tracks production tasks through assignment, completion,
//! quality review and rework, then hands finished work to an external
//! destination in two phases: staging into a batch-scoped holding area and
//! delivery into the client destination.
//!
//! # Architecture
//!
//! Stagehand follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (memory, local disk)
//!
//! # Modules
//!
//! - [`task`]: Work status, review status and the revision ledger
//! - [`export`]: Staging, delivery, progress sessions and recovery
//! - [`transfer`]: File-transfer port and adapters
//! - [`settings`]: Keyed property storage and typed configuration
//! - [`workflow`]: The exposed operation surface
//! - [`outcome`]: Error taxonomy shared by every operation

pub mod export;
pub mod outcome;
pub mod settings;
pub mod task;
pub mod testing;
pub mod transfer;
pub mod workflow;
