//! File-transfer adapter implementations.

pub mod local;
pub mod memory;

pub use local::LocalDirectoryTransfer;
pub use memory::InMemoryFileTransfer;
