//! Domain model for the export pipeline.
//!
//! Export status itself lives on the task aggregate; this module holds the
//! run-level values around it: selection filters, progress sessions, batch
//! views, manifest rows and recovery reports.

mod batch;
mod filters;
mod manifest;
mod recovery;
mod session;
mod summary;

pub use batch::ExportBatch;
pub use filters::StagingFilters;
pub use manifest::ManifestRow;
pub use recovery::{RecoveryStatus, health_score};
pub use session::{
    ExportSession, NewSession, SESSION_KEY_PREFIX, SessionId, SessionPhase, SessionStatus,
};
pub use summary::{CleanupSummary, DeliverySummary, StageSummary, SweepSummary, TaskFailure};
