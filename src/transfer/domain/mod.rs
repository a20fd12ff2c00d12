//! Reference types for containers and files on the transfer backend.

mod refs;

pub use refs::{ContainerRef, DestinationInfo, FileRef, InvalidNameError, validate_entry_name};
