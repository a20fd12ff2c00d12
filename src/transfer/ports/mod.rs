//! Port contracts for the file-transfer backend.

pub mod transfer;

pub use transfer::{FileTransfer, TransferError, TransferResult};
