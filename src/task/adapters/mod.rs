//! Persistence adapters for task lifecycle management.
//!
//! - [`memory::InMemoryTaskRepository`]: thread-safe in-memory storage used by
//!   tests and embedded deployments.

pub mod memory;

pub use memory::InMemoryTaskRepository;
