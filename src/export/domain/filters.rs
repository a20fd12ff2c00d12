//! Selection filters for staging.

use crate::task::domain::ReviewStatus;
use serde::{Deserialize, Serialize};

/// Which completed tasks are admitted into a staging run.
///
/// Passed reviews are always admitted; unreviewed and failed work only when
/// the matching flag is set. Pending reviews are never admitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingFilters {
    /// Admit tasks that were never submitted for review.
    pub include_unreviewed: bool,
    /// Admit tasks whose latest review failed.
    pub include_failed: bool,
    /// Only tasks of this work group.
    pub group: Option<String>,
    /// Only tasks of this import batch.
    pub import_batch_id: Option<String>,
    /// Cap on the number of selected tasks.
    pub max_tasks: Option<usize>,
}

impl StagingFilters {
    /// Admits passed reviews only.
    #[must_use]
    pub fn passed_only() -> Self {
        Self::default()
    }

    /// Also admits unreviewed work.
    #[must_use]
    pub const fn including_unreviewed(mut self) -> Self {
        self.include_unreviewed = true;
        self
    }

    /// Also admits failed reviews.
    #[must_use]
    pub const fn including_failed(mut self) -> Self {
        self.include_failed = true;
        self
    }

    /// Restricts to a work group.
    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Restricts to an import batch.
    #[must_use]
    pub fn in_import_batch(mut self, batch_id: impl Into<String>) -> Self {
        self.import_batch_id = Some(batch_id.into());
        self
    }

    /// Caps the selection size.
    #[must_use]
    pub const fn at_most(mut self, max_tasks: usize) -> Self {
        self.max_tasks = Some(max_tasks);
        self
    }

    /// Returns whether a task with `status` may be staged.
    #[must_use]
    pub const fn admits_review(&self, status: Option<ReviewStatus>) -> bool {
        match status {
            None => self.include_unreviewed,
            Some(ReviewStatus::Passed) => true,
            Some(ReviewStatus::Failed) => self.include_failed,
            Some(ReviewStatus::Pending) => false,
        }
    }
}
