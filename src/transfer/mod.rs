//! File-transfer boundary used by staging and delivery.
//!
//! The transfer service lists, copies and validates write access to
//! containers (folders) holding task artefacts. The core only depends on the
//! [`ports::FileTransfer`] contract:
//!
//! - Reference types in [`domain`]
//! - Port contract in [`ports`]
//! - In-memory and local-directory implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;
