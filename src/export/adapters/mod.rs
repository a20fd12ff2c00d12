//! Manifest adapter implementations.

pub mod memory;

pub use memory::InMemoryManifestRepository;
