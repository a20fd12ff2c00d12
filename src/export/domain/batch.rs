//! Derived view of the tasks sharing an export batch id.

use crate::task::domain::{ExportBatchId, ExportStatus, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-phase counts of one export batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBatch {
    /// Batch identifier.
    pub id: ExportBatchId,
    /// Member tasks.
    pub total: usize,
    /// Members at `STAGING`.
    pub staging: usize,
    /// Members at `STAGED`.
    pub staged: usize,
    /// Members at `STAGING_FAILED`.
    pub staging_failed: usize,
    /// Members at `DELIVERING`.
    pub delivering: usize,
    /// Members at `DELIVERED`.
    pub delivered: usize,
    /// Members at `DELIVERY_FAILED`.
    pub delivery_failed: usize,
    /// Earliest time a member entered staging.
    pub created_date: Option<DateTime<Utc>>,
}

impl ExportBatch {
    fn empty(id: ExportBatchId) -> Self {
        Self {
            id,
            total: 0,
            staging: 0,
            staged: 0,
            staging_failed: 0,
            delivering: 0,
            delivered: 0,
            delivery_failed: 0,
            created_date: None,
        }
    }

    fn add(&mut self, task: &Task) {
        let export = task.export();
        self.total += 1;
        let counter = match export.status() {
            Some(ExportStatus::Staging) => &mut self.staging,
            Some(ExportStatus::Staged) => &mut self.staged,
            Some(ExportStatus::StagingFailed) => &mut self.staging_failed,
            Some(ExportStatus::Delivering) => &mut self.delivering,
            Some(ExportStatus::Delivered) => &mut self.delivered,
            Some(ExportStatus::DeliveryFailed) => &mut self.delivery_failed,
            None => return,
        };
        *counter += 1;
        self.created_date = match (self.created_date, export.staged_at()) {
            (Some(current), Some(candidate)) => Some(current.min(candidate)),
            (current, candidate) => current.or(candidate),
        };
    }

    /// Groups exported tasks by batch id, ordered by batch id.
    ///
    /// Tasks without a batch id are skipped.
    #[must_use]
    pub fn group_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<Self> {
        let mut batches: BTreeMap<ExportBatchId, Self> = BTreeMap::new();
        for task in tasks {
            let Some(batch_id) = task.export().batch_id() else {
                continue;
            };
            batches
                .entry(batch_id.clone())
                .or_insert_with(|| Self::empty(batch_id.clone()))
                .add(task);
        }
        batches.into_values().collect()
    }

    /// Returns whether every member has been delivered.
    #[must_use]
    pub const fn is_fully_delivered(&self) -> bool {
        self.total > 0 && self.delivered == self.total
    }

    /// Members in a state recovery can act on.
    #[must_use]
    pub const fn needs_attention(&self) -> usize {
        self.staging + self.staging_failed + self.delivering + self.delivery_failed
    }
}
