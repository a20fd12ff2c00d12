//! Task aggregate root: work, review and export state plus the revision
//! ledger.

use super::{
    Artifacts, Completion, EmailAddress, ExportBatchId, ExportState, FolderName, ReviewOutcome,
    ReviewRecord, ReviewScore, ReviewStatus, RevisionDraft, RevisionHistory, TaskDomainError,
    TaskId, WorkStatus, normalize_reason,
};
use crate::transfer::domain::ContainerRef;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Reason recorded when a manual override fails a task.
pub const MANUAL_OVERRIDE_REASON: &str = "manual override";

/// Fields supplied by the import collaborator when a task is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Import batch the task arrived in.
    pub batch_id: String,
    /// Work group.
    pub group: String,
    /// Folder name used for staging and delivery subfolders.
    pub folder_name: FolderName,
    /// Container holding the task's source and produced files.
    pub source_container: ContainerRef,
}

impl NewTask {
    /// Creates validated creation fields.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when a text field is blank or the folder
    /// name is invalid.
    pub fn new(
        batch_id: impl Into<String>,
        group: impl Into<String>,
        folder_name: impl Into<String>,
        source_container: ContainerRef,
    ) -> Result<Self, TaskDomainError> {
        let batch = batch_id.into().trim().to_owned();
        if batch.is_empty() {
            return Err(TaskDomainError::EmptyField("batch id"));
        }
        let group_name = group.into().trim().to_owned();
        if group_name.is_empty() {
            return Err(TaskDomainError::EmptyField("group"));
        }
        Ok(Self {
            batch_id: batch,
            group: group_name,
            folder_name: FolderName::new(folder_name)?,
            source_container,
        })
    }
}

/// A scored review request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredReview {
    /// Awarded score.
    pub score: ReviewScore,
    /// Reviewer.
    pub reviewer: EmailAddress,
    /// Minimum passing score.
    pub threshold: ReviewScore,
    /// Feedback recorded on the revision entry when the review fails.
    pub feedback: Option<String>,
}

/// A manual change of review status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOverride {
    /// Review status to apply.
    pub target: ReviewStatus,
    /// Score to record for `PASSED` or `FAILED`.
    pub score: Option<ReviewScore>,
    /// Reviewer applying the override.
    pub reviewer: EmailAddress,
    /// Skips the "complete and pending" guard when set.
    pub override_mode: bool,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    batch_id: String,
    group: String,
    folder_name: FolderName,
    source_container: ContainerRef,
    work_status: WorkStatus,
    assignee: Option<EmailAddress>,
    previous_assignee: Option<EmailAddress>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    artifacts: Artifacts,
    time_taken_secs: Option<u64>,
    review: ReviewRecord,
    revisions: RevisionHistory,
    original_completion_time: Option<DateTime<Utc>>,
    export: ExportState,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an `OPEN` task.
    #[must_use]
    pub fn new(fields: NewTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: TaskId::new(),
            batch_id: fields.batch_id,
            group: fields.group,
            folder_name: fields.folder_name,
            source_container: fields.source_container,
            work_status: WorkStatus::Open,
            assignee: None,
            previous_assignee: None,
            start_time: None,
            end_time: None,
            artifacts: Artifacts::default(),
            time_taken_secs: None,
            review: ReviewRecord::default(),
            revisions: RevisionHistory::new(),
            original_completion_time: None,
            export: ExportState::default(),
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the import batch identifier.
    #[must_use]
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Returns the work group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the folder name.
    #[must_use]
    pub const fn folder_name(&self) -> &FolderName {
        &self.folder_name
    }

    /// Returns the container holding the task's files.
    #[must_use]
    pub const fn source_container(&self) -> &ContainerRef {
        &self.source_container
    }

    /// Returns the work status.
    #[must_use]
    pub const fn work_status(&self) -> WorkStatus {
        self.work_status
    }

    /// Returns the current assignee.
    #[must_use]
    pub const fn assignee(&self) -> Option<&EmailAddress> {
        self.assignee.as_ref()
    }

    /// Returns the assignee before the latest rework hand-back.
    #[must_use]
    pub const fn previous_assignee(&self) -> Option<&EmailAddress> {
        self.previous_assignee.as_ref()
    }

    /// Returns when the current attempt started.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Returns when the current attempt was submitted.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Returns the current artefacts.
    #[must_use]
    pub const fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Returns time spent on the current attempt.
    #[must_use]
    pub const fn time_taken_secs(&self) -> Option<u64> {
        self.time_taken_secs
    }

    /// Returns the review sub-state.
    #[must_use]
    pub const fn review_record(&self) -> &ReviewRecord {
        &self.review
    }

    /// Returns the review status.
    #[must_use]
    pub const fn review_status(&self) -> Option<ReviewStatus> {
        self.review.status
    }

    /// Returns the revision ledger.
    #[must_use]
    pub const fn revisions(&self) -> &RevisionHistory {
        &self.revisions
    }

    /// Returns the number of revisions; always equal to the ledger length.
    #[must_use]
    pub const fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    /// Returns the completion time of the first attempt that was sent back.
    #[must_use]
    pub const fn original_completion_time(&self) -> Option<DateTime<Utc>> {
        self.original_completion_time
    }

    /// Returns the export sub-state.
    #[must_use]
    pub const fn export(&self) -> &ExportState {
        &self.export
    }

    /// Returns the optimistic-lock version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Advances the optimistic-lock version.
    ///
    /// Repository adapters call this once a write has been accepted.
    pub const fn increment_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Claims the task for `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AlreadyAssigned`] when the task is in
    /// progress, or [`TaskDomainError::InvalidWorkStatus`] when it is
    /// complete or flagged. The task is not modified on error.
    pub fn assign(&mut self, agent: EmailAddress, clock: &impl Clock) -> Result<(), TaskDomainError> {
        match self.work_status {
            WorkStatus::InProgress => Err(TaskDomainError::AlreadyAssigned {
                task_id: self.id,
                holder: self
                    .assignee
                    .as_ref()
                    .map_or_else(|| "an unknown agent".to_owned(), ToString::to_string),
            }),
            status if status.is_assignable() => {
                let now = clock.utc();
                self.work_status = WorkStatus::InProgress;
                self.assignee = Some(agent);
                self.start_time = Some(now);
                self.updated_at = now;
                Ok(())
            }
            status => Err(self.invalid_work_status("assign", status)),
        }
    }

    /// Submits work, deriving the review status.
    ///
    /// A reviewer completing a rework of their own failing review is
    /// auto-passed without touching the recorded review; otherwise first
    /// submissions and rework submissions go to `PENDING`. A failed review
    /// counts as a rework submission even when the task was re-claimed
    /// through [`Self::assign`] first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] unless the task is in
    /// progress or in rework.
    pub fn complete(
        &mut self,
        completion: Completion,
        agent: EmailAddress,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let prior_status = self.work_status;
        if !prior_status.accepts_completion() {
            return Err(self.invalid_work_status("complete", prior_status));
        }
        let now = clock.utc();

        if self.review.failed_by(&agent) {
            self.review.status = Some(ReviewStatus::Passed);
        } else if self.review.status.is_none()
            || prior_status == WorkStatus::Rework
            || self.review.status == Some(ReviewStatus::Failed)
        {
            self.review.status = Some(ReviewStatus::Pending);
        }

        self.time_taken_secs = completion
            .time_taken_secs
            .or_else(|| self.start_time.map(|start| elapsed_secs(start, now)));
        self.work_status = WorkStatus::Complete;
        self.end_time = Some(now);
        self.artifacts = completion.artifacts;
        self.assignee = Some(agent);
        self.updated_at = now;
        Ok(())
    }

    /// Applies a scored review.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] or
    /// [`TaskDomainError::ReviewNotPending`] unless the task is complete and
    /// awaiting review.
    pub fn review(
        &mut self,
        review: ScoredReview,
        clock: &impl Clock,
    ) -> Result<ReviewOutcome, TaskDomainError> {
        self.ensure_reviewable()?;
        let now = clock.utc();
        if review.score >= review.threshold {
            self.review
                .record(ReviewStatus::Passed, Some(review.score), review.reviewer, now);
            self.updated_at = now;
            return Ok(ReviewOutcome::Passed);
        }

        let reason = review
            .feedback
            .clone()
            .unwrap_or_else(|| format!("review failed with score {}", review.score));
        let revision_number = self.fail_into_rework(Some(review.score), review.reviewer, &reason, now);
        Ok(ReviewOutcome::Failed { revision_number })
    }

    /// Sends completed work back to `requested_by` without a review verdict.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] unless the task is
    /// complete.
    pub fn request_rework(
        &mut self,
        requested_by: EmailAddress,
        reason: Option<&str>,
        clock: &impl Clock,
    ) -> Result<u32, TaskDomainError> {
        if self.work_status != WorkStatus::Complete {
            return Err(self.invalid_work_status("request rework for", self.work_status));
        }
        let now = clock.utc();
        let draft = self.snapshot(
            self.review.score,
            self.review.reviewer.clone(),
            self.review.reviewed_at,
            normalize_reason(reason),
            now,
        );
        Ok(self.send_back(draft, requested_by, now))
    }

    /// Forces the review status, optionally bypassing the review guard.
    ///
    /// # Errors
    ///
    /// Returns the review guard errors when `override_mode` is unset, or
    /// [`TaskDomainError::NoRevisionToRestore`] when a rework task has no
    /// ledger entry to restore from.
    pub fn override_review(
        &mut self,
        request: ReviewOverride,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !request.override_mode {
            self.ensure_reviewable()?;
        }
        let now = clock.utc();
        match request.target {
            ReviewStatus::Passed => {
                if self.work_status == WorkStatus::Rework {
                    self.restore_last_revision()?;
                }
                self.review
                    .record(ReviewStatus::Passed, request.score, request.reviewer, now);
            }
            ReviewStatus::Failed => {
                if self.work_status == WorkStatus::Complete {
                    self.fail_into_rework(request.score, request.reviewer, MANUAL_OVERRIDE_REASON, now);
                } else {
                    self.review
                        .record(ReviewStatus::Failed, request.score, request.reviewer, now);
                }
            }
            ReviewStatus::Pending => {
                self.review.reset_to_pending();
                if self.work_status == WorkStatus::Rework && self.artifacts.any_present() {
                    self.work_status = WorkStatus::Complete;
                }
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Sets the task aside, releasing any holder.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] when the task is
    /// complete or already flagged.
    pub fn flag(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if matches!(self.work_status, WorkStatus::Complete | WorkStatus::Flagged) {
            return Err(self.invalid_work_status("flag", self.work_status));
        }
        if let Some(holder) = self.assignee.take() {
            self.previous_assignee = Some(holder);
        }
        self.work_status = WorkStatus::Flagged;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Returns a flagged task to `OPEN`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] unless the task is
    /// flagged.
    pub fn reopen(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if self.work_status != WorkStatus::Flagged {
            return Err(self.invalid_work_status("reopen", self.work_status));
        }
        self.work_status = WorkStatus::Open;
        self.assignee = None;
        self.start_time = None;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Enters staging under `batch_id`; an already assigned batch id is kept.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidWorkStatus`] unless the task is
    /// complete, or [`TaskDomainError::InvalidExportTransition`] when it has
    /// been exported before.
    pub fn begin_staging(
        &mut self,
        batch_id: &ExportBatchId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.work_status != WorkStatus::Complete {
            return Err(self.invalid_work_status("stage", self.work_status));
        }
        let now = clock.utc();
        self.export.begin_staging(self.id, batch_id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Moves a failed staging attempt back to `STAGING`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless staging
    /// failed.
    pub fn retry_staging(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.retry_staging(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Records a successful staging of `file_count` files.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless staging.
    pub fn mark_staged(&mut self, file_count: u32, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.mark_staged(self.id, file_count, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Records a staging attempt that copied nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless staging.
    pub fn mark_staging_failed(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.mark_staging_failed(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Enters delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless staged or
    /// delivery failed.
    pub fn begin_delivery(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.begin_delivery(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Records a successful delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless delivering.
    pub fn mark_delivered(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.mark_delivered(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed delivery.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless delivering.
    pub fn mark_delivery_failed(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.mark_delivery_failed(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Returns an interrupted or failed delivery to `STAGED`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless delivering
    /// or delivery failed.
    pub fn return_to_staged(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        self.export.return_to_staged(self.id, now)?;
        self.updated_at = now;
        Ok(())
    }

    /// Clears every export field of an abandoned task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidExportTransition`] unless the
    /// export status is unsettled.
    pub fn reset_export(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.export.reset(self.id)?;
        self.updated_at = clock.utc();
        Ok(())
    }

    fn ensure_reviewable(&self) -> Result<(), TaskDomainError> {
        if self.work_status != WorkStatus::Complete {
            return Err(self.invalid_work_status("review", self.work_status));
        }
        if self.review.status != Some(ReviewStatus::Pending) {
            return Err(TaskDomainError::review_not_pending(self.id, self.review.status));
        }
        Ok(())
    }

    const fn invalid_work_status(&self, operation: &'static str, status: WorkStatus) -> TaskDomainError {
        TaskDomainError::InvalidWorkStatus {
            task_id: self.id,
            operation,
            status,
        }
    }

    /// Failing verdict: snapshot, hand back and record `FAILED`.
    ///
    /// The first-ever revision returns to the agent who did the work; later
    /// ones go to the reviewer.
    fn fail_into_rework(
        &mut self,
        score: Option<ReviewScore>,
        reviewer: EmailAddress,
        reason: &str,
        now: DateTime<Utc>,
    ) -> u32 {
        let draft = self.snapshot(
            score,
            Some(reviewer.clone()),
            Some(now),
            normalize_reason(Some(reason)),
            now,
        );
        let next_holder = if self.revisions.is_empty() {
            self.assignee.clone().unwrap_or_else(|| reviewer.clone())
        } else {
            reviewer.clone()
        };
        let revision_number = self.send_back(draft, next_holder, now);
        self.review
            .record(ReviewStatus::Failed, score, reviewer, now);
        revision_number
    }

    fn snapshot(
        &self,
        review_score: Option<ReviewScore>,
        reviewed_by: Option<EmailAddress>,
        reviewed_at: Option<DateTime<Utc>>,
        reason: String,
        now: DateTime<Utc>,
    ) -> RevisionDraft {
        RevisionDraft {
            agent: self.assignee.clone(),
            started_at: self.start_time,
            completed_at: self.end_time,
            artifacts: self.artifacts.clone(),
            time_taken_secs: self.time_taken_secs,
            review_score,
            reviewed_by,
            reviewed_at,
            reason,
            recorded_at: now,
        }
    }

    fn send_back(&mut self, draft: RevisionDraft, next_holder: EmailAddress, now: DateTime<Utc>) -> u32 {
        if self.revisions.is_empty() {
            self.original_completion_time = self.end_time;
        }
        let revision_number = self.revisions.append(draft);
        self.previous_assignee = self.assignee.replace(next_holder);
        self.work_status = WorkStatus::Rework;
        self.start_time = Some(now);
        self.end_time = None;
        self.artifacts = Artifacts::default();
        self.time_taken_secs = None;
        self.updated_at = now;
        revision_number
    }

    fn restore_last_revision(&mut self) -> Result<(), TaskDomainError> {
        let last = self
            .revisions
            .last()
            .ok_or(TaskDomainError::NoRevisionToRestore(self.id))?;
        self.artifacts = last.artifacts().clone();
        self.time_taken_secs = last.time_taken_secs();
        self.end_time = last.completed_at();
        self.work_status = WorkStatus::Complete;
        Ok(())
    }
}

fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}
