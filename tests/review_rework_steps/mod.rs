//! Step definitions for review and rework scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
