//! Domain model for the task lifecycle.
//!
//! A task carries three independent state dimensions (work, review and
//! export) plus an append-only revision ledger. Every transition is a method
//! on [`Task`] and validates the current state before mutating anything.

mod artifacts;
mod error;
mod export_state;
mod ids;
mod review;
mod revision;
mod status;
mod task;

pub use artifacts::{ArtifactKind, Artifacts, Completion};
pub use error::{ParseStatusError, TaskDomainError};
pub use export_state::ExportState;
pub use ids::{EmailAddress, ExportBatchId, FolderName, ReviewScore, TaskId};
pub use review::{ReviewOutcome, ReviewRecord};
pub use revision::{
    DEFAULT_REWORK_REASON, MAX_REASON_CHARS, RevisionDraft, RevisionEntry, RevisionHistory,
    normalize_reason,
};
pub use status::{ExportStatus, ReviewStatus, WorkStatus};
pub use task::{MANUAL_OVERRIDE_REASON, NewTask, ReviewOverride, ScoredReview, Task};
