//! Progress snapshot of an in-flight staging or delivery run.

use super::TaskFailure;
use crate::task::domain::{ExportBatchId, TaskId};
use crate::transfer::domain::ContainerRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix under which sessions are stored in the property store.
pub const SESSION_KEY_PREFIX: &str = "export_";

/// Identifier of an export session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier received from a caller.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `value` is not a UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value.trim()).map(Self)
    }

    /// Returns the property-store key, `export_<id>`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{SESSION_KEY_PREFIX}{}", self.0)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline phase a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Copying into the batch staging container.
    Staging,
    /// Copying staged files into the destination.
    Delivery,
}

/// Run status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Still processing tasks.
    Running,
    /// Every task succeeded.
    Completed,
    /// Finished with at least one per-task failure.
    CompletedWithErrors,
    /// The wall-clock budget ran out; remaining tasks were released.
    TimedOut,
    /// Stopped before processing any task.
    Aborted,
}

impl SessionStatus {
    /// Returns whether the run has ended.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Parameters for opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    /// Session identifier.
    pub id: SessionId,
    /// Phase being tracked.
    pub phase: SessionPhase,
    /// Tasks the run will process, in order.
    pub task_ids: Vec<TaskId>,
    /// Delivery destination, when known.
    pub destination: Option<ContainerRef>,
    /// Batch being processed.
    pub export_batch_id: Option<ExportBatchId>,
}

/// Persisted progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSession {
    /// Session identifier.
    pub id: SessionId,
    /// Phase being tracked.
    pub phase: SessionPhase,
    /// Run status.
    pub status: SessionStatus,
    /// Batch being processed.
    pub export_batch_id: Option<ExportBatchId>,
    /// Delivery destination.
    pub destination: Option<ContainerRef>,
    /// Tasks the run processes, in order.
    pub task_ids: Vec<TaskId>,
    /// Number of tasks in the run.
    pub total: usize,
    /// Index of the next task to process.
    pub current_index: usize,
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Per-task failures.
    pub errors: Vec<TaskFailure>,
    /// Files copied so far.
    pub total_files_copied: u64,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Last persisted update.
    pub updated_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: Option<DateTime<Utc>>,
}

impl ExportSession {
    /// Opens a running session.
    #[must_use]
    pub fn start(params: NewSession, at: DateTime<Utc>) -> Self {
        Self {
            id: params.id,
            phase: params.phase,
            status: SessionStatus::Running,
            export_batch_id: params.export_batch_id,
            destination: params.destination,
            total: params.task_ids.len(),
            task_ids: params.task_ids,
            current_index: 0,
            succeeded: 0,
            failed: 0,
            errors: Vec::new(),
            total_files_copied: 0,
            started_at: at,
            updated_at: at,
            finished_at: None,
        }
    }

    /// Records a task that succeeded after copying `files` files.
    pub const fn record_success(&mut self, files: u64) {
        self.succeeded = self.succeeded.saturating_add(1);
        self.total_files_copied = self.total_files_copied.saturating_add(files);
        self.current_index = self.current_index.saturating_add(1);
    }

    /// Records a task failure.
    pub fn record_failure(&mut self, failure: TaskFailure, files: u64) {
        self.failed = self.failed.saturating_add(1);
        self.total_files_copied = self.total_files_copied.saturating_add(files);
        self.current_index = self.current_index.saturating_add(1);
        self.errors.push(failure);
    }

    /// Ends the run, deriving the status from the failure count unless the
    /// run timed out.
    pub const fn finish(&mut self, timed_out: bool, at: DateTime<Utc>) {
        self.status = if timed_out {
            SessionStatus::TimedOut
        } else if self.failed > 0 {
            SessionStatus::CompletedWithErrors
        } else {
            SessionStatus::Completed
        };
        self.finished_at = Some(at);
    }

    /// Ends the run without processing anything.
    pub const fn abort(&mut self, at: DateTime<Utc>) {
        self.status = SessionStatus::Aborted;
        self.finished_at = Some(at);
    }

    /// Returns progress through the task list as a percentage.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let done = self.current_index.min(self.total).saturating_mul(100);
        done.checked_div(self.total)
            .map_or(100, |percent| u8::try_from(percent).unwrap_or(100))
    }
}
