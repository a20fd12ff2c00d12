//! Port contracts for keyed property storage.

pub mod properties;

pub use properties::{KeyedPropertyStore, PropertyStoreError, PropertyStoreResult};
