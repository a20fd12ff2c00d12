//! Step definitions for export scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
