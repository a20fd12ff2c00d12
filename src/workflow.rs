//! Exposed operation surface.
//!
//! [`Workflow`] wires the lifecycle, export and recovery services over one
//! set of ports and converts every layered error into an
//! [`OperationFailure`] carrying its [`crate::outcome::ErrorKind`]. Wrap a
//! result in [`crate::outcome::Envelope`] for a `{success, data, error}`
//! response.

use crate::export::{
    domain::{
        CleanupSummary, DeliverySummary, ExportBatch, ExportSession, RecoveryStatus,
        StageSummary, StagingFilters, SweepSummary,
    },
    ports::ManifestRepository,
    services::{ExportPipelineService, RecoveryService, SessionTracker},
};
use crate::outcome::{Classify, ErrorKind, OperationFailure};
use crate::settings::{Settings, SettingsLoader, ports::KeyedPropertyStore};
use crate::task::{
    domain::{ExportBatchId, NewTask, Task, TaskId},
    ports::TaskRepository,
    services::{
        CompleteTaskRequest, OverrideReviewRequest, ReviewResult, ReviewTaskRequest,
        TaskLifecycleService,
    },
};
use crate::transfer::{domain::ContainerRef, ports::FileTransfer};
use mockable::Clock;
use std::sync::Arc;

/// Result type of every exposed operation.
pub type OperationResult<T> = Result<T, OperationFailure>;

fn failure(err: &impl Classify) -> OperationFailure {
    err.to_failure()
}

/// Port implementations the workflow runs on.
#[derive(Debug)]
pub struct WorkflowPorts<R, T, M, P, C> {
    /// Task store.
    pub tasks: Arc<R>,
    /// File-transfer backend.
    pub transfer: Arc<T>,
    /// Staging manifest.
    pub manifest: Arc<M>,
    /// Keyed property store for sessions and settings.
    pub properties: Arc<P>,
    /// Time source.
    pub clock: Arc<C>,
}

/// Every exposed operation over one set of ports.
#[derive(Clone)]
pub struct Workflow<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    lifecycle: TaskLifecycleService<R, C>,
    pipeline: ExportPipelineService<R, T, M, P, C>,
    recovery: RecoveryService<R, T, M, P, C>,
    default_destination: Option<ContainerRef>,
}

impl<R, T, M, P, C> Workflow<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    /// Wires the services with explicit settings.
    #[must_use]
    pub fn new(ports: WorkflowPorts<R, T, M, P, C>, settings: Settings) -> Self {
        let WorkflowPorts {
            tasks,
            transfer,
            manifest,
            properties,
            clock,
        } = ports;
        let lifecycle = TaskLifecycleService::new(Arc::clone(&tasks), Arc::clone(&clock))
            .with_policy(settings.review);
        let sessions = SessionTracker::new(properties, Arc::clone(&clock))
            .with_ttl(settings.recovery.session_ttl);
        let pipeline =
            ExportPipelineService::new(tasks, transfer, manifest, sessions, clock, settings.export);
        let recovery = RecoveryService::new(pipeline.clone(), settings.recovery);
        Self {
            lifecycle,
            pipeline,
            recovery,
            default_destination: settings.default_destination,
        }
    }

    /// Wires the services with settings read from the property store.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` failure when a stored setting is
    /// malformed.
    pub async fn load(
        ports: WorkflowPorts<R, T, M, P, C>,
        staging_root: ContainerRef,
    ) -> OperationResult<Self> {
        let settings = SettingsLoader::new(Arc::clone(&ports.properties))
            .load(staging_root)
            .await
            .map_err(|err| failure(&err))?;
        Ok(Self::new(ports, settings))
    }

    /// Returns the lifecycle service.
    #[must_use]
    pub const fn lifecycle(&self) -> &TaskLifecycleService<R, C> {
        &self.lifecycle
    }

    /// Returns the export pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &ExportPipelineService<R, T, M, P, C> {
        &self.pipeline
    }

    /// Returns the recovery service.
    #[must_use]
    pub const fn recovery(&self) -> &RecoveryService<R, T, M, P, C> {
        &self.recovery
    }

    /// Creates an `OPEN` task.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` failure when the id is already stored.
    pub async fn create_task(&self, fields: NewTask) -> OperationResult<Task> {
        self.lifecycle.create(fields).await.map_err(|err| failure(&err))
    }

    /// Returns a task by id.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` failure when the task does not exist.
    pub async fn get_task(&self, task_id: TaskId) -> OperationResult<Task> {
        self.lifecycle.get(task_id).await.map_err(|err| failure(&err))
    }

    /// Claims an `OPEN` task for `agent`.
    ///
    /// # Errors
    ///
    /// Returns a `Conflict` failure when the task is already in progress,
    /// otherwise `InvalidState`, `ValidationError` or `NotFound`.
    pub async fn assign_task(&self, task_id: TaskId, agent: &str) -> OperationResult<Task> {
        self.lifecycle
            .assign(task_id, agent)
            .await
            .map_err(|err| failure(&err))
    }

    /// Submits completed work.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidState` failure unless the task is in progress or
    /// in rework.
    pub async fn complete_task(&self, request: CompleteTaskRequest) -> OperationResult<Task> {
        self.lifecycle
            .complete(request)
            .await
            .map_err(|err| failure(&err))
    }

    /// Scores completed work against the configured threshold.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidState` failure unless the task is complete and
    /// awaiting review, or `ValidationError` for an out-of-range score.
    pub async fn review_task(&self, request: ReviewTaskRequest) -> OperationResult<ReviewResult> {
        self.lifecycle
            .review(request)
            .await
            .map_err(|err| failure(&err))
    }

    /// Sends completed work back without a review verdict.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidState` failure unless the task is complete.
    pub async fn request_rework(
        &self,
        task_id: TaskId,
        requested_by: &str,
        reason: Option<&str>,
    ) -> OperationResult<Task> {
        self.lifecycle
            .request_rework(task_id, requested_by, reason)
            .await
            .map_err(|err| failure(&err))
    }

    /// Forces the review status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the review guard applies and fails or no
    /// revision can be restored.
    pub async fn manual_review_override(
        &self,
        request: OverrideReviewRequest,
    ) -> OperationResult<Task> {
        self.lifecycle
            .override_review(request)
            .await
            .map_err(|err| failure(&err))
    }

    /// Sets a task aside.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the task cannot be flagged.
    pub async fn flag_task(&self, task_id: TaskId) -> OperationResult<Task> {
        self.lifecycle.flag(task_id).await.map_err(|err| failure(&err))
    }

    /// Returns a flagged task to the open pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the task is flagged.
    pub async fn reopen_task(&self, task_id: TaskId) -> OperationResult<Task> {
        self.lifecycle.reopen(task_id).await.map_err(|err| failure(&err))
    }

    /// Selects and stages tasks, generating a batch id when none is given.
    ///
    /// # Errors
    ///
    /// Returns a `TransferFailure` failure when the staging area is
    /// unusable; per-task failures are reported in the summary.
    pub async fn stage_tasks(
        &self,
        filters: &StagingFilters,
        batch_id: Option<ExportBatchId>,
    ) -> OperationResult<StageSummary> {
        self.pipeline
            .stage_selected(filters, batch_id)
            .await
            .map_err(|err| failure(&err))
    }

    /// Delivers a staged batch, falling back to the configured default
    /// destination.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` failure when no destination is known, or
    /// `TransferFailure` when it is not writable.
    pub async fn deliver_batch(
        &self,
        batch_id: &ExportBatchId,
        destination: Option<&ContainerRef>,
    ) -> OperationResult<DeliverySummary> {
        let target = self.destination(destination)?;
        self.pipeline
            .deliver(batch_id, target)
            .await
            .map_err(|err| failure(&err))
    }

    /// Re-drives tasks stuck at `STAGING`.
    ///
    /// # Errors
    ///
    /// As [`Self::stage_tasks`].
    pub async fn resume_staging(&self, batch_id: &ExportBatchId) -> OperationResult<StageSummary> {
        self.recovery
            .resume_stuck_staging(batch_id)
            .await
            .map_err(|err| failure(&err))
    }

    /// Retries tasks at `STAGING_FAILED`.
    ///
    /// # Errors
    ///
    /// As [`Self::stage_tasks`].
    pub async fn retry_staging(&self, batch_id: &ExportBatchId) -> OperationResult<StageSummary> {
        self.recovery
            .retry_failed_staging(batch_id)
            .await
            .map_err(|err| failure(&err))
    }

    /// Re-drives tasks stuck at `DELIVERING` into `destination`.
    ///
    /// The original destination is not recorded, so it must be supplied.
    ///
    /// # Errors
    ///
    /// Returns a `TransferFailure` failure when the destination is not
    /// writable.
    pub async fn resume_delivery(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
    ) -> OperationResult<DeliverySummary> {
        self.recovery
            .resume_stuck_delivery(batch_id, destination)
            .await
            .map_err(|err| failure(&err))
    }

    /// Retries tasks at `DELIVERY_FAILED` into `destination`.
    ///
    /// # Errors
    ///
    /// As [`Self::resume_delivery`].
    pub async fn retry_delivery(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
    ) -> OperationResult<DeliverySummary> {
        self.recovery
            .retry_failed_delivery(batch_id, destination)
            .await
            .map_err(|err| failure(&err))
    }

    /// Resets unsettled tasks at least `max_age_days` old.
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` failure when the task store fails.
    pub async fn cleanup_abandoned(&self, max_age_days: u32) -> OperationResult<CleanupSummary> {
        self.recovery
            .cleanup_abandoned(max_age_days)
            .await
            .map_err(|err| failure(&err))
    }

    /// Runs the periodic cleanup and session purge.
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` failure when a store fails.
    pub async fn sweep(&self) -> OperationResult<SweepSummary> {
        self.recovery.sweep().await.map_err(|err| failure(&err))
    }

    /// Returns the progress snapshot of a run.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a malformed id and `NotFound` for a
    /// missing or expired session.
    pub async fn get_export_progress(&self, session_id: &str) -> OperationResult<ExportSession> {
        self.pipeline
            .sessions()
            .get_by_str(session_id)
            .await
            .map_err(|err| failure(&err))
    }

    /// Reports stuck, failed and abandoned exports.
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` failure when the task store fails.
    pub async fn get_recovery_status(&self) -> OperationResult<RecoveryStatus> {
        self.recovery
            .recovery_status()
            .await
            .map_err(|err| failure(&err))
    }

    /// Lists export batches with their per-phase counts.
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` failure when the task store fails.
    pub async fn list_batches(&self) -> OperationResult<Vec<ExportBatch>> {
        self.pipeline
            .list_batches()
            .await
            .map_err(|err| failure(&err))
    }

    fn destination<'a>(
        &'a self,
        requested: Option<&'a ContainerRef>,
    ) -> OperationResult<&'a ContainerRef> {
        requested
            .or(self.default_destination.as_ref())
            .ok_or_else(|| {
                OperationFailure::new(
                    ErrorKind::ValidationError,
                    "no destination given and no default destination configured",
                )
            })
    }
}
