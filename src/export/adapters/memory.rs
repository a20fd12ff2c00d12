//! In-memory manifest repository.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::export::{
    domain::ManifestRow,
    ports::{ManifestError, ManifestRepository, ManifestResult},
};
use crate::task::domain::{ExportBatchId, TaskId};

/// Thread-safe in-memory manifest.
#[derive(Debug, Clone, Default)]
pub struct InMemoryManifestRepository {
    rows: Arc<RwLock<Vec<ManifestRow>>>,
}

impl InMemoryManifestRepository {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded row.
    #[must_use]
    pub fn rows(&self) -> Vec<ManifestRow> {
        self.rows.read().map(|rows| rows.clone()).unwrap_or_default()
    }
}

fn lock_error(err: impl ToString) -> ManifestError {
    ManifestError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ManifestRepository for InMemoryManifestRepository {
    async fn record(&self, row: &ManifestRow) -> ManifestResult<()> {
        let mut rows = self.rows.write().map_err(lock_error)?;
        rows.push(row.clone());
        Ok(())
    }

    async fn latest_for_task(&self, task_id: TaskId) -> ManifestResult<Option<ManifestRow>> {
        let rows = self.rows.read().map_err(lock_error)?;
        Ok(rows.iter().rev().find(|row| row.task_id == task_id).cloned())
    }

    async fn rows_for_batch(&self, batch_id: &ExportBatchId) -> ManifestResult<Vec<ManifestRow>> {
        let rows = self.rows.read().map_err(lock_error)?;
        Ok(rows
            .iter()
            .filter(|row| &row.export_batch_id == batch_id)
            .cloned()
            .collect())
    }
}
