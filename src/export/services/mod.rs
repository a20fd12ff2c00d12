//! Application services for staging, delivery and recovery.

mod config;
mod pipeline;
mod recovery;
mod session;

pub use config::{
    DEFAULT_CHUNK_PAUSE, DEFAULT_CHUNK_SIZE, DEFAULT_DELIVERY_BUDGET, DEFAULT_RAW_INPUT_NAMES,
    DEFAULT_REQUIRED_ARTIFACTS, DEFAULT_STAGING_CONTAINER_TEMPLATE, ExportConfig, RecoveryConfig,
};
pub use pipeline::ExportPipelineService;
pub(crate) use pipeline::staging_folder_name;
pub use recovery::RecoveryService;
pub use session::{DEFAULT_SESSION_TTL, SessionTracker};
