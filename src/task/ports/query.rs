//! Query filters understood by task repositories.

use crate::task::domain::{ExportBatchId, ExportStatus, ReviewStatus, Task, WorkStatus};

/// Constraint on an optional status dimension (review or export).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter<S> {
    /// No constraint.
    Any,
    /// The status is unset (unreviewed, unexported).
    Absent,
    /// The status is set to anything.
    Present,
    /// The status is one of the listed values.
    In(Vec<S>),
}

impl<S> Default for StatusFilter<S> {
    fn default() -> Self {
        Self::Any
    }
}

impl<S: PartialEq + Copy> StatusFilter<S> {
    /// Returns whether `status` satisfies the filter.
    #[must_use]
    pub fn matches(&self, status: Option<S>) -> bool {
        match self {
            Self::Any => true,
            Self::Absent => status.is_none(),
            Self::Present => status.is_some(),
            Self::In(allowed) => status.is_some_and(|current| allowed.contains(&current)),
        }
    }
}

/// Conjunction of optional task filters.
///
/// Adapters may translate the filters into their native query language;
/// [`TaskQuery::matches`] is the reference semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Required work status.
    pub work_status: Option<WorkStatus>,
    /// Review status constraint.
    pub review: StatusFilter<ReviewStatus>,
    /// Export status constraint.
    pub export: StatusFilter<ExportStatus>,
    /// Required export batch.
    pub export_batch_id: Option<ExportBatchId>,
    /// Required work group.
    pub group: Option<String>,
    /// Required import batch.
    pub import_batch_id: Option<String>,
    /// Maximum number of tasks returned.
    pub limit: Option<usize>,
}

impl TaskQuery {
    /// Matches every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to `status`.
    #[must_use]
    pub const fn with_work_status(mut self, status: WorkStatus) -> Self {
        self.work_status = Some(status);
        self
    }

    /// Restricts the review status.
    #[must_use]
    pub fn with_review(mut self, filter: StatusFilter<ReviewStatus>) -> Self {
        self.review = filter;
        self
    }

    /// Restricts the export status.
    #[must_use]
    pub fn with_export(mut self, filter: StatusFilter<ExportStatus>) -> Self {
        self.export = filter;
        self
    }

    /// Restricts the export status to one of `statuses`.
    #[must_use]
    pub fn with_export_statuses(self, statuses: &[ExportStatus]) -> Self {
        self.with_export(StatusFilter::In(statuses.to_vec()))
    }

    /// Restricts to members of an export batch.
    #[must_use]
    pub fn in_export_batch(mut self, batch_id: &ExportBatchId) -> Self {
        self.export_batch_id = Some(batch_id.clone());
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

    /// Caps the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns whether `task` satisfies every filter except the limit.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.work_status.is_none_or(|status| task.work_status() == status)
            && self.review.matches(task.review_status())
            && self.export.matches(task.export().status())
            && self
                .export_batch_id
                .as_ref()
                .is_none_or(|batch| task.export().batch_id() == Some(batch))
            && self.group.as_deref().is_none_or(|group| task.group() == group)
            && self
                .import_batch_id
                .as_deref()
                .is_none_or(|batch| task.batch_id() == batch)
    }
}
