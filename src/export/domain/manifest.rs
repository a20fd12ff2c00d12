//! Manifest rows recording where each task was staged.

use crate::task::domain::{ExportBatchId, ExportStatus, FolderName, TaskId};
use crate::transfer::domain::ContainerRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per staging outcome.
///
/// Delivery reads the latest row of a task to find its staged folder, and
/// cleanup uses it to remove emptied containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    /// Task staged.
    pub task_id: TaskId,
    /// Batch the task was staged under.
    pub export_batch_id: ExportBatchId,
    /// Task folder name.
    pub folder_name: FolderName,
    /// Work group.
    pub group: String,
    /// Export status after the attempt (`STAGED` or `STAGING_FAILED`).
    pub status: ExportStatus,
    /// Files copied.
    pub file_count: u32,
    /// Batch-scoped staging container.
    pub batch_container: ContainerRef,
    /// Task subfolder inside the batch container, if it was created.
    pub task_container: Option<ContainerRef>,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}
