//! Error types for task domain validation and transitions.

use super::{ExportStatus, ReviewStatus, TaskId, WorkStatus};
use crate::outcome::{Classify, ErrorKind};
use thiserror::Error;

/// Errors returned while constructing task values or applying transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The email address is malformed.
    #[error("invalid email address '{0}'")]
    InvalidEmail(String),

    /// The folder name is empty or contains path separators.
    #[error("invalid folder name '{0}'")]
    InvalidFolderName(String),

    /// The export batch identifier is malformed.
    #[error("invalid export batch id '{0}', expected 1-128 characters of [A-Za-z0-9_-]")]
    InvalidExportBatchId(String),

    /// A review score or threshold lies outside 0..=100.
    #[error("score {0} is out of range, expected 0..=100")]
    ScoreOutOfRange(u16),

    /// A required text field is blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The task is already held by another agent.
    #[error("task {task_id} is already in progress with {holder}")]
    AlreadyAssigned {
        /// Task identifier.
        task_id: TaskId,
        /// Current holder, as recorded on the task.
        holder: String,
    },

    /// The operation is not allowed for the current work status.
    #[error("cannot {operation} task {task_id} while it is {status}")]
    InvalidWorkStatus {
        /// Task identifier.
        task_id: TaskId,
        /// Operation that was attempted.
        operation: &'static str,
        /// Current work status.
        status: WorkStatus,
    },

    /// Review requires a pending review status.
    #[error("task {task_id} is not awaiting review (review status: {status})")]
    ReviewNotPending {
        /// Task identifier.
        task_id: TaskId,
        /// Current review status in canonical form, or `none`.
        status: String,
    },

    /// The export status transition is not allowed.
    #[error("invalid export transition for task {task_id}: {from} -> {to}")]
    InvalidExportTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current export status in canonical form, or `none`.
        from: String,
        /// Requested export status in canonical form, or `none`.
        to: String,
    },

    /// Restoring from the revision ledger needs at least one entry.
    #[error("task {0} has no revision to restore from")]
    NoRevisionToRestore(TaskId),

    /// A persisted revision ledger is not numbered `1..=n`.
    #[error("revision history is corrupt: {0}")]
    InvalidRevisionHistory(String),
}

impl TaskDomainError {
    pub(crate) fn review_not_pending(task_id: TaskId, status: Option<ReviewStatus>) -> Self {
        Self::ReviewNotPending {
            task_id,
            status: status.map_or("none", ReviewStatus::as_str).to_owned(),
        }
    }

    pub(crate) fn export_transition(
        task_id: TaskId,
        from: Option<ExportStatus>,
        to: Option<ExportStatus>,
    ) -> Self {
        Self::InvalidExportTransition {
            task_id,
            from: ExportStatus::label(from).to_owned(),
            to: ExportStatus::label(to).to_owned(),
        }
    }
}

impl Classify for TaskDomainError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail(_)
            | Self::InvalidFolderName(_)
            | Self::InvalidExportBatchId(_)
            | Self::ScoreOutOfRange(_)
            | Self::EmptyField(_)
            | Self::InvalidRevisionHistory(_) => ErrorKind::ValidationError,
            Self::AlreadyAssigned { .. } => ErrorKind::Conflict,
            Self::InvalidWorkStatus { .. }
            | Self::ReviewNotPending { .. }
            | Self::InvalidExportTransition { .. }
            | Self::NoRevisionToRestore(_) => ErrorKind::InvalidState,
        }
    }
}

/// Error returned while parsing a status from persistence or input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {dimension} status: {value}")]
pub struct ParseStatusError {
    /// Status dimension being parsed (`work`, `review` or `export`).
    pub dimension: &'static str,
    /// Rejected input.
    pub value: String,
}
