//! Results returned by batch operations.
//!
//! Batch operations never fail because of a single task; they report what
//! happened per task instead.

use super::SessionId;
use crate::outcome::{ErrorKind, OperationFailure};
use crate::task::domain::{ExportBatchId, TaskId};
use crate::transfer::domain::{ContainerRef, DestinationInfo};
use serde::{Deserialize, Serialize};

/// A per-task failure recorded during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    /// Task that failed.
    pub task_id: TaskId,
    /// Rendered cause.
    pub message: String,
}

impl TaskFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            task_id,
            message: message.into(),
        }
    }
}

/// Outcome of a staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Session tracking the run.
    pub session_id: SessionId,
    /// Batch the tasks were staged under.
    pub export_batch_id: ExportBatchId,
    /// Batch-scoped staging container.
    pub container: Option<ContainerRef>,
    /// Tasks the run attempted.
    pub total: usize,
    /// Tasks that reached `STAGED`.
    pub staged: usize,
    /// Tasks that failed.
    pub failed: usize,
    /// Files copied across all tasks.
    pub files_copied: u64,
    /// Per-task failures.
    pub failures: Vec<TaskFailure>,
}

impl StageSummary {
    /// Returns whether every attempted task was staged.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Outcome of a delivery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    /// Session tracking the run.
    pub session_id: SessionId,
    /// Batch that was delivered.
    pub export_batch_id: ExportBatchId,
    /// Destination as reported by the transfer backend.
    pub destination: DestinationInfo,
    /// Tasks the run picked up.
    pub total: usize,
    /// Tasks that reached `DELIVERED`.
    pub delivered: usize,
    /// Tasks that reached `DELIVERY_FAILED` or could not enter delivery.
    pub failed: usize,
    /// Tasks returned to `STAGED` because the budget ran out.
    pub reset_to_staged: usize,
    /// Files copied across all tasks.
    pub files_copied: u64,
    /// Whether the wall-clock budget ran out mid-run.
    pub timed_out: bool,
    /// Per-task failures.
    pub failures: Vec<TaskFailure>,
}

impl DeliverySummary {
    /// Returns whether the run finished every task without failures.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0 && !self.timed_out
    }

    /// Failure view of a run cut short by its budget.
    #[must_use]
    pub fn timeout_failure(&self) -> Option<OperationFailure> {
        self.timed_out.then(|| {
            OperationFailure::new(
                ErrorKind::Timeout,
                format!(
                    "delivery of batch '{}' ran out of time; {} task(s) returned to STAGED",
                    self.export_batch_id, self.reset_to_staged
                ),
            )
        })
    }
}

/// Outcome of an abandoned-task cleanup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSummary {
    /// Tasks whose export state was cleared.
    pub reset_task_ids: Vec<TaskId>,
    /// Empty staging containers that were removed.
    pub removed_containers: Vec<ContainerRef>,
    /// Tasks that could not be reset.
    pub failures: Vec<TaskFailure>,
}

/// Outcome of a periodic recovery sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Abandoned-task cleanup.
    pub cleanup: CleanupSummary,
    /// Expired progress sessions deleted.
    pub purged_sessions: usize,
}
