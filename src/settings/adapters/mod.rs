//! Property store adapter implementations.

pub mod memory;

pub use memory::InMemoryPropertyStore;
