//! Service layer for work-status and review-status transitions.

use super::ReviewPolicy;
use crate::outcome::{Classify, ErrorKind};
use crate::task::{
    domain::{
        Artifacts, Completion, EmailAddress, NewTask, ReviewOutcome, ReviewOverride,
        ReviewScore, ReviewStatus, ScoredReview, Task, TaskDomainError, TaskId,
    },
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Request payload for submitting completed work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteTaskRequest {
    task_id: TaskId,
    agent: String,
    artifacts: Artifacts,
    time_taken_secs: Option<u64>,
}

impl CompleteTaskRequest {
    /// Creates a request with the produced artefacts.
    #[must_use]
    pub fn new(task_id: TaskId, agent: impl Into<String>, artifacts: Artifacts) -> Self {
        Self {
            task_id,
            agent: agent.into(),
            artifacts,
            time_taken_secs: None,
        }
    }

    /// Sets the time spent explicitly instead of deriving it.
    #[must_use]
    pub const fn with_time_taken_secs(mut self, seconds: u64) -> Self {
        self.time_taken_secs = Some(seconds);
        self
    }
}

/// Request payload for a scored review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewTaskRequest {
    task_id: TaskId,
    score: u16,
    reviewer: String,
    feedback: Option<String>,
}

impl ReviewTaskRequest {
    /// Creates a review request.
    #[must_use]
    pub fn new(task_id: TaskId, score: u16, reviewer: impl Into<String>) -> Self {
        Self {
            task_id,
            score,
            reviewer: reviewer.into(),
            feedback: None,
        }
    }

    /// Sets feedback recorded on the revision entry if the review fails.
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Request payload for a manual review override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideReviewRequest {
    task_id: TaskId,
    target: ReviewStatus,
    score: Option<u16>,
    reviewer: String,
    override_mode: bool,
}

impl OverrideReviewRequest {
    /// Creates an override request that still applies the review guard.
    #[must_use]
    pub fn new(task_id: TaskId, target: ReviewStatus, reviewer: impl Into<String>) -> Self {
        Self {
            task_id,
            target,
            score: None,
            reviewer: reviewer.into(),
            override_mode: false,
        }
    }

    /// Sets the score to record.
    #[must_use]
    pub const fn with_score(mut self, score: u16) -> Self {
        self.score = Some(score);
        self
    }

    /// Enables or disables bypassing the "complete and pending" guard.
    #[must_use]
    pub const fn with_override_mode(mut self, enabled: bool) -> Self {
        self.override_mode = enabled;
        self
    }
}

/// A reviewed task together with the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewResult {
    /// Task as persisted after the review.
    pub task: Task,
    /// Verdict.
    pub outcome: ReviewOutcome,
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Domain validation or transition guard failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// The addressed task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

impl Classify for TaskLifecycleError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(err) => err.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
///
/// Every mutation loads the task, applies one aggregate transition and
/// writes it back through the version-checked repository update, so two
/// concurrent transitions on the same task cannot both succeed.
#[derive(Clone)]
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    policy: ReviewPolicy,
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service with the default review policy.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            repository,
            clock,
            policy: ReviewPolicy::default(),
        }
    }

    /// Replaces the review policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ReviewPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the active review policy.
    #[must_use]
    pub const fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Stores a new `OPEN` task on behalf of the import collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when persistence fails.
    pub async fn create(&self, fields: NewTask) -> TaskLifecycleResult<Task> {
        let task = Task::new(fields, &*self.clock);
        self.repository.store(&task).await?;
        debug!(task_id = %task.id(), "Task created");
        Ok(task)
    }

    /// Loads a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not exist.
    pub async fn get(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    /// Claims a task for `agent`.
    ///
    /// # Errors
    ///
    /// Returns a Conflict-kind error when the task is already in progress and
    /// an `InvalidState` one when it is complete or flagged.
    pub async fn assign(&self, task_id: TaskId, agent: &str) -> TaskLifecycleResult<Task> {
        let email = EmailAddress::new(agent)?;
        let (task, ()) = self
            .mutate(task_id, move |current, clock| current.assign(email, clock))
            .await?;
        debug!(task_id = %task_id, assignee = %agent, "Task assigned");
        Ok(task)
    }

    /// Submits work for review.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the agent email is malformed, the
    /// task is missing, or the task is not in progress or in rework.
    pub async fn complete(&self, request: CompleteTaskRequest) -> TaskLifecycleResult<Task> {
        let agent = EmailAddress::new(request.agent)?;
        let mut completion = Completion::new(request.artifacts);
        if let Some(seconds) = request.time_taken_secs {
            completion = completion.with_time_taken_secs(seconds);
        }
        let (task, ()) = self
            .mutate(request.task_id, move |current, clock| {
                current.complete(completion, agent, clock)
            })
            .await?;
        debug!(
            task_id = %task.id(),
            review_status = ?task.review_status(),
            "Task completed"
        );
        Ok(task)
    }

    /// Applies a scored review using the service's policy.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the score is out of range, the
    /// reviewer email is malformed, or the task is not complete and pending.
    pub async fn review(&self, request: ReviewTaskRequest) -> TaskLifecycleResult<ReviewResult> {
        let review = ScoredReview {
            score: ReviewScore::new(request.score)?,
            reviewer: EmailAddress::new(request.reviewer)?,
            threshold: self.policy.pass_threshold,
            feedback: request.feedback,
        };
        let (task, outcome) = self
            .mutate(request.task_id, move |current, clock| current.review(review, clock))
            .await?;
        if let ReviewOutcome::Failed { revision_number } = outcome {
            info!(
                task_id = %task.id(),
                revision_number,
                assignee = ?task.assignee().map(EmailAddress::as_str),
                "Review failed; task sent back for rework"
            );
        }
        Ok(ReviewResult { task, outcome })
    }

    /// Sends completed work back to `requested_by`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the email is malformed or the task
    /// is not complete.
    pub async fn request_rework(
        &self,
        task_id: TaskId,
        requested_by: &str,
        reason: Option<&str>,
    ) -> TaskLifecycleResult<Task> {
        let requester = EmailAddress::new(requested_by)?;
        let owned_reason = reason.map(str::to_owned);
        let (task, revision_number) = self
            .mutate(task_id, move |current, clock| {
                current.request_rework(requester, owned_reason.as_deref(), clock)
            })
            .await?;
        info!(task_id = %task_id, revision_number, "Rework requested");
        Ok(task)
    }

    /// Forces the review status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when input is malformed, the guard
    /// applies and fails, or a rework task has no revision to restore.
    pub async fn override_review(
        &self,
        request: OverrideReviewRequest,
    ) -> TaskLifecycleResult<Task> {
        let score = request.score.map(ReviewScore::new).transpose()?;
        let change = ReviewOverride {
            target: request.target,
            score,
            reviewer: EmailAddress::new(request.reviewer)?,
            override_mode: request.override_mode,
        };
        let (task, ()) = self
            .mutate(request.task_id, move |current, clock| {
                current.override_review(change, clock)
            })
            .await?;
        info!(
            task_id = %task.id(),
            review_status = %request.target,
            override_mode = request.override_mode,
            "Review status overridden"
        );
        Ok(task)
    }

    /// Sets a task aside.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is complete or already
    /// flagged.
    pub async fn flag(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let (task, ()) = self.mutate(task_id, |current, clock| current.flag(clock)).await?;
        info!(task_id = %task_id, "Task flagged");
        Ok(task)
    }

    /// Returns a flagged task to the open pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] unless the task is flagged.
    pub async fn reopen(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let (task, ()) = self.mutate(task_id, |current, clock| current.reopen(clock)).await?;
        info!(task_id = %task_id, "Task reopened");
        Ok(task)
    }

    async fn mutate<T, F>(&self, task_id: TaskId, transition: F) -> TaskLifecycleResult<(Task, T)>
    where
        F: FnOnce(&mut Task, &C) -> Result<T, TaskDomainError> + Send,
        T: Send,
    {
        let mut task = self.get(task_id).await?;
        let value = transition(&mut task, &*self.clock)?;
        let persisted = self.repository.update(&task).await?;
        Ok((persisted, value))
    }
}
