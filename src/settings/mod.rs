//! Keyed property storage and typed configuration.
//!
//! A simple string key/value store backs both ephemeral export sessions and
//! operator-tunable settings such as the review pass threshold. The
//! [`SettingsLoader`] turns stored overrides into typed configuration.

pub mod adapters;
pub mod ports;

mod loader;

pub use loader::{Settings, SettingsError, SettingsLoader, keys};
