//! Port contracts owned by the export pipeline.
//!
//! Task persistence, file transfer and property storage are shared ports
//! from their own contexts; only the manifest belongs here.

pub mod manifest;

pub use manifest::{ManifestError, ManifestRepository, ManifestResult};
