//! Port contracts for task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

mod query;
pub mod repository;

pub use query::{StatusFilter, TaskQuery};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
