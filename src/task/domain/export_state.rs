//! Export sub-state of a task: staging and delivery progress.

use super::{ExportBatchId, ExportStatus, TaskDomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Export fields carried by a task.
///
/// `export_time` records the latest export transition, so it measures how
/// long a task has sat in its current export status. `staged_at` records
/// the first entry into `STAGING` and only a reset clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportState {
    status: Option<ExportStatus>,
    batch_id: Option<ExportBatchId>,
    export_time: Option<DateTime<Utc>>,
    #[serde(default)]
    staged_at: Option<DateTime<Utc>>,
    staged_file_count: u32,
}

impl ExportState {
    /// Returns the export status.
    #[must_use]
    pub const fn status(&self) -> Option<ExportStatus> {
        self.status
    }

    /// Returns the export batch identifier.
    #[must_use]
    pub const fn batch_id(&self) -> Option<&ExportBatchId> {
        self.batch_id.as_ref()
    }

    /// Returns the time of the latest export transition.
    #[must_use]
    pub const fn export_time(&self) -> Option<DateTime<Utc>> {
        self.export_time
    }

    /// Returns when the task first entered staging under its batch.
    #[must_use]
    pub const fn staged_at(&self) -> Option<DateTime<Utc>> {
        self.staged_at
    }

    /// Returns how many files were staged.
    #[must_use]
    pub const fn staged_file_count(&self) -> u32 {
        self.staged_file_count
    }

    fn move_to(
        &mut self,
        task_id: TaskId,
        to: ExportStatus,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if !ExportStatus::can_transition(self.status, Some(to)) {
            return Err(TaskDomainError::export_transition(
                task_id,
                self.status,
                Some(to),
            ));
        }
        self.status = Some(to);
        self.export_time = Some(at);
        Ok(())
    }

    pub(super) fn begin_staging(
        &mut self,
        task_id: TaskId,
        batch_id: &ExportBatchId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if self.status.is_some() {
            return Err(TaskDomainError::export_transition(
                task_id,
                self.status,
                Some(ExportStatus::Staging),
            ));
        }
        self.move_to(task_id, ExportStatus::Staging, at)?;
        if self.staged_at.is_none() {
            self.staged_at = Some(at);
        }
        if self.batch_id.is_none() {
            self.batch_id = Some(batch_id.clone());
        }
        Ok(())
    }

    pub(super) fn retry_staging(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if self.status != Some(ExportStatus::StagingFailed) {
            return Err(TaskDomainError::export_transition(
                task_id,
                self.status,
                Some(ExportStatus::Staging),
            ));
        }
        self.move_to(task_id, ExportStatus::Staging, at)
    }

    pub(super) fn mark_staged(
        &mut self,
        task_id: TaskId,
        file_count: u32,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        if self.status != Some(ExportStatus::Staging) {
            return Err(TaskDomainError::export_transition(
                task_id,
                self.status,
                Some(ExportStatus::Staged),
            ));
        }
        self.move_to(task_id, ExportStatus::Staged, at)?;
        self.staged_file_count = file_count;
        Ok(())
    }

    pub(super) fn mark_staging_failed(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.move_to(task_id, ExportStatus::StagingFailed, at)?;
        self.staged_file_count = 0;
        Ok(())
    }

    pub(super) fn begin_delivery(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.move_to(task_id, ExportStatus::Delivering, at)
    }

    pub(super) fn mark_delivered(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.move_to(task_id, ExportStatus::Delivered, at)
    }

    pub(super) fn mark_delivery_failed(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.move_to(task_id, ExportStatus::DeliveryFailed, at)
    }

    pub(super) fn return_to_staged(
        &mut self,
        task_id: TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), TaskDomainError> {
        self.move_to(task_id, ExportStatus::Staged, at)
    }

    pub(super) fn reset(&mut self, task_id: TaskId) -> Result<(), TaskDomainError> {
        if !ExportStatus::can_transition(self.status, None) {
            return Err(TaskDomainError::export_transition(task_id, self.status, None));
        }
        *self = Self::default();
        Ok(())
    }
}
