//! Manifest persistence port.

use crate::export::domain::ManifestRow;
use crate::outcome::{Classify, ErrorKind};
use crate::task::domain::{ExportBatchId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Append-only record of staging outcomes.
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    /// Appends a row.
    async fn record(&self, row: &ManifestRow) -> ManifestResult<()>;

    /// Returns the most recent row for `task_id`.
    async fn latest_for_task(&self, task_id: TaskId) -> ManifestResult<Option<ManifestRow>>;

    /// Returns every row of a batch in recording order.
    async fn rows_for_batch(&self, batch_id: &ExportBatchId) -> ManifestResult<Vec<ManifestRow>>;
}

/// Errors returned by manifest implementations.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// Persistence-layer failure.
    #[error("manifest persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ManifestError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

impl Classify for ManifestError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Persistence
    }
}
