//! Export pipeline: selection, staging and budgeted delivery.

use super::{ExportConfig, SessionTracker};
use crate::export::domain::{
    DeliverySummary, ExportBatch, ExportSession, ManifestRow, NewSession, SessionId,
    SessionPhase, StageSummary, StagingFilters, TaskFailure,
};
use crate::export::error::{ExportError, ExportResult};
use crate::export::ports::ManifestRepository;
use crate::settings::ports::KeyedPropertyStore;
use crate::task::domain::{ExportBatchId, ExportStatus, Task, TaskDomainError, WorkStatus};
use crate::task::ports::{StatusFilter, TaskQuery, TaskRepository};
use crate::transfer::domain::{ContainerRef, DestinationInfo};
use crate::transfer::ports::FileTransfer;
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Files copied for one task and the problems met on the way.
#[derive(Debug, Default)]
struct CopyAttempt {
    task_container: Option<ContainerRef>,
    copied: u32,
    problems: Vec<String>,
}

impl CopyAttempt {
    fn problem(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    fn describe(&self, fallback: &str) -> String {
        if self.problems.is_empty() {
            fallback.to_owned()
        } else {
            self.problems.join("; ")
        }
    }
}

/// Drives tasks through staging and delivery.
///
/// Every task is checkpointed to the task store straight after its copy
/// attempt, so an interrupted run leaves each task in a state the recovery
/// module can resume from. A failing task never aborts the batch; only an
/// unusable staging area or destination aborts, and it does so before any
/// task is touched.
pub struct ExportPipelineService<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    tasks: Arc<R>,
    transfer: Arc<T>,
    manifest: Arc<M>,
    sessions: SessionTracker<P, C>,
    clock: Arc<C>,
    config: ExportConfig,
}

impl<R, T, M, P, C> Clone for ExportPipelineService<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            transfer: Arc::clone(&self.transfer),
            manifest: Arc::clone(&self.manifest),
            sessions: self.sessions.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<R, T, M, P, C> ExportPipelineService<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    /// Creates a new export pipeline service.
    #[must_use]
    pub const fn new(
        tasks: Arc<R>,
        transfer: Arc<T>,
        manifest: Arc<M>,
        sessions: SessionTracker<P, C>,
        clock: Arc<C>,
        config: ExportConfig,
    ) -> Self {
        Self {
            tasks,
            transfer,
            manifest,
            sessions,
            clock,
            config,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Returns the session tracker runs report into.
    #[must_use]
    pub const fn sessions(&self) -> &SessionTracker<P, C> {
        &self.sessions
    }

    pub(crate) const fn tasks(&self) -> &Arc<R> {
        &self.tasks
    }

    pub(crate) const fn transfer(&self) -> &Arc<T> {
        &self.transfer
    }

    pub(crate) const fn manifest(&self) -> &Arc<M> {
        &self.manifest
    }

    pub(crate) const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Returns completed, never-exported tasks admitted by `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Tasks`] when the task store query fails.
    pub async fn select_for_staging(&self, filters: &StagingFilters) -> ExportResult<Vec<Task>> {
        let mut query = TaskQuery::all()
            .with_work_status(WorkStatus::Complete)
            .with_export(StatusFilter::Absent);
        if let Some(group) = &filters.group {
            query = query.in_group(group.clone());
        }
        if let Some(import_batch) = &filters.import_batch_id {
            query = query.in_import_batch(import_batch.clone());
        }
        let candidates = self.tasks.query(&query).await?;
        Ok(candidates
            .into_iter()
            .filter(|task| {
                task.artifacts().has_all(&self.config.required_artifacts)
                    && filters.admits_review(task.review_status())
            })
            .take(filters.max_tasks.unwrap_or(usize::MAX))
            .collect())
    }

    /// Selects tasks and stages them under `batch_id`, generating a batch id
    /// when none is given.
    ///
    /// # Errors
    ///
    /// As [`Self::select_for_staging`] and [`Self::stage`].
    pub async fn stage_selected(
        &self,
        filters: &StagingFilters,
        batch_id: Option<ExportBatchId>,
    ) -> ExportResult<StageSummary> {
        let batch = batch_id.unwrap_or_else(|| ExportBatchId::generate(&*self.clock));
        let selected = self.select_for_staging(filters).await?;
        self.stage(selected, &batch).await
    }

    /// Stages `tasks` into one container for `batch_id`.
    ///
    /// All tasks are marked `STAGING` before any copying starts. Each task
    /// then copies every file of its source container except raw inputs
    /// into a subfolder named `<folder_name>_<task_id>`, ending `STAGED` when at least
    /// one file was copied and `STAGING_FAILED` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Destination`] when the staging container cannot
    /// be created, or a session error when the run cannot be tracked. Both
    /// happen before any task changes.
    pub async fn stage(&self, tasks: Vec<Task>, batch_id: &ExportBatchId) -> ExportResult<StageSummary> {
        let started_at = self.clock.utc();
        if tasks.is_empty() {
            let session = self.aborted_session(SessionPhase::Staging, batch_id, None).await?;
            return Ok(stage_summary(&session, batch_id, None));
        }

        let container = self.staging_container(batch_id, started_at).await?;
        let mut session = self
            .sessions
            .create(NewSession {
                id: SessionId::new(),
                phase: SessionPhase::Staging,
                task_ids: tasks.iter().map(Task::id).collect(),
                destination: Some(container.clone()),
                export_batch_id: Some(batch_id.clone()),
            })
            .await?;
        info!(
            export_batch_id = %batch_id,
            session_id = %session.id,
            tasks = tasks.len(),
            container = %container,
            "Staging started"
        );

        let mut marked = Vec::with_capacity(tasks.len());
        for mut task in tasks {
            let task_id = task.id();
            match self
                .checkpoint(&mut task, |current, clock| current.begin_staging(batch_id, clock))
                .await
            {
                Ok(()) => marked.push(task),
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "Task could not enter staging");
                    session.record_failure(TaskFailure::new(task_id, err.to_string()), 0);
                }
            }
        }
        self.persist_progress(&mut session).await;

        self.run_staging(session, marked, batch_id, &container).await
    }

    /// Re-drives staging for tasks of `batch_id` still at `STAGING`.
    ///
    /// The batch container recorded in the manifest is reused; the batch id
    /// of every task is left as it is.
    ///
    /// # Errors
    ///
    /// As [`Self::stage`].
    pub async fn resume_staging(&self, batch_id: &ExportBatchId) -> ExportResult<StageSummary> {
        let stuck = self
            .tasks
            .query(
                &TaskQuery::all()
                    .in_export_batch(batch_id)
                    .with_export_statuses(&[ExportStatus::Staging]),
            )
            .await?;
        if stuck.is_empty() {
            let session = self.aborted_session(SessionPhase::Staging, batch_id, None).await?;
            return Ok(stage_summary(&session, batch_id, None));
        }

        let recorded = self
            .manifest
            .rows_for_batch(batch_id)
            .await?
            .into_iter()
            .map(|row| row.batch_container)
            .next();
        let container = match recorded {
            Some(container) => container,
            None => {
                let started_at = stuck
                    .iter()
                    .filter_map(|task| task.export().staged_at())
                    .min()
                    .unwrap_or_else(|| self.clock.utc());
                self.staging_container(batch_id, started_at).await?
            }
        };
        let session = self
            .sessions
            .create(NewSession {
                id: SessionId::new(),
                phase: SessionPhase::Staging,
                task_ids: stuck.iter().map(Task::id).collect(),
                destination: Some(container.clone()),
                export_batch_id: Some(batch_id.clone()),
            })
            .await?;
        info!(
            export_batch_id = %batch_id,
            session_id = %session.id,
            tasks = stuck.len(),
            "Staging resumed"
        );
        self.run_staging(session, stuck, batch_id, &container).await
    }

    /// Delivers the `STAGED` and `DELIVERY_FAILED` tasks of `batch_id` into
    /// `destination`.
    ///
    /// All picked-up tasks are marked `DELIVERING` first. The run checks its
    /// wall-clock budget before each task; once it is spent, every task not
    /// yet processed returns to `STAGED` and the summary reports
    /// `timed_out`. Calling again picks up exactly those tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Destination`] when the destination is not
    /// writable; no task is touched in that case.
    pub async fn deliver(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
    ) -> ExportResult<DeliverySummary> {
        let info = self
            .transfer
            .validate_writable(destination)
            .await
            .map_err(ExportError::Destination)?;
        let candidates = self
            .tasks
            .query(
                &TaskQuery::all()
                    .in_export_batch(batch_id)
                    .with_export_statuses(&[ExportStatus::Staged, ExportStatus::DeliveryFailed]),
            )
            .await?;
        let mut session = self
            .sessions
            .create(NewSession {
                id: SessionId::new(),
                phase: SessionPhase::Delivery,
                task_ids: candidates.iter().map(Task::id).collect(),
                destination: Some(destination.clone()),
                export_batch_id: Some(batch_id.clone()),
            })
            .await?;
        info!(
            export_batch_id = %batch_id,
            session_id = %session.id,
            tasks = candidates.len(),
            destination = %info.url,
            "Delivery started"
        );

        let mut delivering = Vec::with_capacity(candidates.len());
        for mut task in candidates {
            let task_id = task.id();
            match self
                .checkpoint(&mut task, |current, clock| current.begin_delivery(clock))
                .await
            {
                Ok(()) => delivering.push(task),
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "Task could not enter delivery");
                    session.record_failure(TaskFailure::new(task_id, err.to_string()), 0);
                }
            }
        }
        self.persist_progress(&mut session).await;

        let deadline = self
            .clock
            .utc()
            .checked_add_signed(self.config.delivery_budget_delta());
        let mut timed_out = false;
        let mut reset_to_staged = 0;
        let mut queue = delivering.into_iter();
        for task in queue.by_ref() {
            if self.budget_spent(deadline) {
                timed_out = true;
                reset_to_staged += self.release_to_staged(task, &mut session).await;
                break;
            }
            self.deliver_one(task, destination, &mut session).await;
            self.persist_progress(&mut session).await;
        }
        for task in queue {
            reset_to_staged += self.release_to_staged(task, &mut session).await;
        }

        session.finish(timed_out, self.clock.utc());
        self.persist_progress(&mut session).await;
        if timed_out {
            warn!(
                export_batch_id = %batch_id,
                reset_to_staged,
                "Delivery budget exhausted; remaining tasks returned to STAGED"
            );
        }
        info!(
            export_batch_id = %batch_id,
            delivered = session.succeeded,
            failed = session.failed,
            "Delivery finished"
        );
        Ok(delivery_summary(
            &session,
            batch_id,
            info,
            reset_to_staged,
            timed_out,
        ))
    }

    /// Lists every export batch with its per-phase counts.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Tasks`] when the task store query fails.
    pub async fn list_batches(&self) -> ExportResult<Vec<ExportBatch>> {
        let exported = self
            .tasks
            .query(&TaskQuery::all().with_export(StatusFilter::Present))
            .await?;
        Ok(ExportBatch::group_tasks(&exported))
    }

    /// Applies one export transition and persists it.
    pub(crate) async fn checkpoint<F>(&self, task: &mut Task, transition: F) -> ExportResult<()>
    where
        F: FnOnce(&mut Task, &C) -> Result<(), TaskDomainError> + Send,
    {
        transition(task, &*self.clock)?;
        *task = self.tasks.update(task).await?;
        Ok(())
    }

    async fn run_staging(
        &self,
        mut session: ExportSession,
        tasks: Vec<Task>,
        batch_id: &ExportBatchId,
        container: &ContainerRef,
    ) -> ExportResult<StageSummary> {
        for (index, chunk) in tasks.chunks(self.config.effective_chunk_size()).enumerate() {
            if index > 0 && !self.config.chunk_pause.is_zero() {
                tokio::time::sleep(self.config.chunk_pause).await;
            }
            for task in chunk {
                self.stage_one(task.clone(), batch_id, container, &mut session)
                    .await;
                self.persist_progress(&mut session).await;
            }
        }

        session.finish(false, self.clock.utc());
        self.persist_progress(&mut session).await;
        info!(
            export_batch_id = %batch_id,
            staged = session.succeeded,
            failed = session.failed,
            files = session.total_files_copied,
            "Staging finished"
        );
        Ok(stage_summary(&session, batch_id, Some(container.clone())))
    }

    async fn stage_one(
        &self,
        mut task: Task,
        batch_id: &ExportBatchId,
        batch_container: &ContainerRef,
        session: &mut ExportSession,
    ) {
        let task_id = task.id();
        let mut attempt = self.copy_into_staging(&task, batch_container).await;

        let mut status = if attempt.copied > 0 {
            ExportStatus::Staged
        } else {
            ExportStatus::StagingFailed
        };
        let row = ManifestRow {
            task_id,
            export_batch_id: batch_id.clone(),
            folder_name: task.folder_name().clone(),
            group: task.group().to_owned(),
            status,
            file_count: attempt.copied,
            batch_container: batch_container.clone(),
            task_container: attempt.task_container.clone(),
            recorded_at: self.clock.utc(),
        };
        if let Err(err) = self.manifest.record(&row).await {
            warn!(task_id = %task_id, error = %err, "Manifest row could not be written");
            if status == ExportStatus::Staged {
                attempt.problem(format!("manifest row not written: {err}"));
                status = ExportStatus::StagingFailed;
            }
        }

        let copied = attempt.copied;
        let persisted = if status == ExportStatus::Staged {
            self.checkpoint(&mut task, move |current, clock| current.mark_staged(copied, clock))
                .await
        } else {
            self.checkpoint(&mut task, |current, clock| current.mark_staging_failed(clock))
                .await
        };

        match persisted {
            Ok(()) if status == ExportStatus::Staged => {
                debug!(task_id = %task_id, files = copied, "Task staged");
                session.record_success(u64::from(copied));
            }
            Ok(()) => {
                let message = attempt.describe("no stageable files in source container");
                warn!(task_id = %task_id, reason = %message, "Task staging failed");
                session.record_failure(TaskFailure::new(task_id, message), u64::from(copied));
            }
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "Staging result could not be saved");
                session.record_failure(TaskFailure::new(task_id, err.to_string()), u64::from(copied));
            }
        }
    }

    async fn copy_into_staging(&self, task: &Task, batch_container: &ContainerRef) -> CopyAttempt {
        let mut attempt = CopyAttempt::default();
        let task_container = match self
            .transfer
            .create_container(&staging_folder_name(task), batch_container)
            .await
        {
            Ok(container) => container,
            Err(err) => {
                attempt.problem(err.to_string());
                return attempt;
            }
        };
        attempt.task_container = Some(task_container.clone());

        let files = match self.transfer.list_files(task.source_container()).await {
            Ok(files) => files,
            Err(err) => {
                attempt.problem(err.to_string());
                return attempt;
            }
        };
        for file in files.iter().filter(|file| !self.config.is_raw_input(file.name())) {
            match self
                .transfer
                .copy_file(file, &task_container, file.name())
                .await
            {
                Ok(_) => attempt.copied = attempt.copied.saturating_add(1),
                Err(err) => {
                    warn!(task_id = %task.id(), file = %file, error = %err, "File not staged");
                    attempt.problem(err.to_string());
                }
            }
        }
        attempt
    }

    async fn deliver_one(
        &self,
        mut task: Task,
        destination: &ContainerRef,
        session: &mut ExportSession,
    ) {
        let task_id = task.id();
        let attempt = self.copy_into_destination(&task, destination).await;
        let delivered = attempt.problems.is_empty() && attempt.copied > 0;

        let persisted = if delivered {
            self.checkpoint(&mut task, |current, clock| current.mark_delivered(clock))
                .await
        } else {
            self.checkpoint(&mut task, |current, clock| current.mark_delivery_failed(clock))
                .await
        };
        let copied = u64::from(attempt.copied);
        match persisted {
            Ok(()) if delivered => {
                debug!(task_id = %task_id, files = copied, "Task delivered");
                session.record_success(copied);
            }
            Ok(()) => {
                let message = attempt.describe("staged folder is empty");
                warn!(task_id = %task_id, reason = %message, "Task delivery failed");
                session.record_failure(TaskFailure::new(task_id, message), copied);
            }
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "Delivery result could not be saved");
                session.record_failure(TaskFailure::new(task_id, err.to_string()), copied);
            }
        }
    }

    async fn copy_into_destination(&self, task: &Task, destination: &ContainerRef) -> CopyAttempt {
        let mut attempt = CopyAttempt::default();
        let staged = match self.manifest.latest_for_task(task.id()).await {
            Ok(Some(ManifestRow {
                task_container: Some(container),
                status: ExportStatus::Staged,
                ..
            })) => container,
            Ok(_) => {
                attempt.problem("no staged folder recorded for task");
                return attempt;
            }
            Err(err) => {
                attempt.problem(err.to_string());
                return attempt;
            }
        };
        let files = match self.transfer.list_files(&staged).await {
            Ok(files) => files,
            Err(err) => {
                attempt.problem(err.to_string());
                return attempt;
            }
        };
        if files.is_empty() {
            return attempt;
        }
        let target = match self
            .transfer
            .create_container(task.folder_name().as_str(), destination)
            .await
        {
            Ok(container) => container,
            Err(err) => {
                attempt.problem(err.to_string());
                return attempt;
            }
        };
        attempt.task_container = Some(target.clone());
        for file in &files {
            match self.transfer.copy_file(file, &target, file.name()).await {
                Ok(_) => attempt.copied = attempt.copied.saturating_add(1),
                Err(err) => {
                    warn!(task_id = %task.id(), file = %file, error = %err, "File not delivered");
                    attempt.problem(err.to_string());
                }
            }
        }
        attempt
    }

    async fn release_to_staged(&self, mut task: Task, session: &mut ExportSession) -> usize {
        let task_id = task.id();
        match self
            .checkpoint(&mut task, |current, clock| current.return_to_staged(clock))
            .await
        {
            Ok(()) => 1,
            Err(err) => {
                warn!(task_id = %task_id, error = %err, "Task could not be returned to STAGED");
                session.record_failure(TaskFailure::new(task_id, err.to_string()), 0);
                0
            }
        }
    }

    fn budget_spent(&self, deadline: Option<DateTime<Utc>>) -> bool {
        deadline.is_some_and(|limit| self.clock.utc() >= limit)
    }

    /// Finds or creates the batch staging container.
    pub(crate) async fn staging_container(
        &self,
        batch_id: &ExportBatchId,
        date: DateTime<Utc>,
    ) -> ExportResult<ContainerRef> {
        let name = self.config.staging_container_name(batch_id, date)?;
        let root = &self.config.staging_root;
        let existing = self
            .transfer
            .find_container(&name, root)
            .await
            .map_err(ExportError::Destination)?;
        match existing {
            Some(container) => Ok(container),
            None => self
                .transfer
                .create_container(&name, root)
                .await
                .map_err(ExportError::Destination),
        }
    }

    async fn aborted_session(
        &self,
        phase: SessionPhase,
        batch_id: &ExportBatchId,
        destination: Option<ContainerRef>,
    ) -> ExportResult<ExportSession> {
        let mut session = self
            .sessions
            .create(NewSession {
                id: SessionId::new(),
                phase,
                task_ids: Vec::new(),
                destination,
                export_batch_id: Some(batch_id.clone()),
            })
            .await?;
        session.abort(self.clock.utc());
        self.sessions.update(&mut session).await?;
        info!(export_batch_id = %batch_id, "Nothing to process");
        Ok(session)
    }

    async fn persist_progress(&self, session: &mut ExportSession) {
        if let Err(err) = self.sessions.update(session).await {
            warn!(session_id = %session.id, error = %err, "Progress snapshot not saved");
        }
    }
}

/// Staging subfolder of a task; folder names are only unique per group.
pub(crate) fn staging_folder_name(task: &Task) -> String {
    format!("{}_{}", task.folder_name(), task.id())
}

fn stage_summary(
    session: &ExportSession,
    batch_id: &ExportBatchId,
    container: Option<ContainerRef>,
) -> StageSummary {
    StageSummary {
        session_id: session.id,
        export_batch_id: batch_id.clone(),
        container,
        total: session.total,
        staged: session.succeeded,
        failed: session.failed,
        files_copied: session.total_files_copied,
        failures: session.errors.clone(),
    }
}

fn delivery_summary(
    session: &ExportSession,
    batch_id: &ExportBatchId,
    destination: DestinationInfo,
    reset_to_staged: usize,
    timed_out: bool,
) -> DeliverySummary {
    DeliverySummary {
        session_id: session.id,
        export_batch_id: batch_id.clone(),
        destination,
        total: session.total,
        delivered: session.succeeded,
        failed: session.failed,
        reset_to_staged,
        files_copied: session.total_files_copied,
        timed_out,
        failures: session.errors.clone(),
    }
}
