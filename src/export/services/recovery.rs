//! Recovery module: resumes interrupted runs and clears abandoned exports.

use super::{ExportPipelineService, RecoveryConfig};
use crate::export::domain::{
    CleanupSummary, DeliverySummary, ExportBatch, RecoveryStatus, StageSummary, SweepSummary,
    TaskFailure, health_score,
};
use crate::export::error::{ExportError, ExportResult};
use crate::export::ports::ManifestRepository;
use crate::settings::ports::KeyedPropertyStore;
use crate::task::domain::{ExportBatchId, ExportStatus, Task};
use crate::task::ports::{StatusFilter, TaskQuery, TaskRepository};
use crate::transfer::domain::ContainerRef;
use crate::transfer::ports::FileTransfer;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Time a task last moved through the pipeline, or its creation time.
fn reference_time(task: &Task) -> DateTime<Utc> {
    task.export().export_time().unwrap_or(task.created_at())
}

fn cutoff(now: DateTime<Utc>, age: TimeDelta) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(age)
}

fn days(count: u32) -> TimeDelta {
    TimeDelta::try_days(i64::from(count)).unwrap_or(TimeDelta::MAX)
}

/// Repairs tasks left in non-terminal export states.
///
/// Every repair goes through the pipeline, so the same per-task
/// checkpointing applies. Nothing here consults the health score.
#[derive(Clone)]
pub struct RecoveryService<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    pipeline: ExportPipelineService<R, T, M, P, C>,
    config: RecoveryConfig,
}

impl<R, T, M, P, C> RecoveryService<R, T, M, P, C>
where
    R: TaskRepository,
    T: FileTransfer,
    M: ManifestRepository,
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    /// Creates a recovery service driving `pipeline`.
    #[must_use]
    pub const fn new(pipeline: ExportPipelineService<R, T, M, P, C>, config: RecoveryConfig) -> Self {
        Self { pipeline, config }
    }

    /// Returns the active thresholds.
    #[must_use]
    pub const fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Re-drives staging for tasks still at `STAGING`.
    ///
    /// # Errors
    ///
    /// As [`ExportPipelineService::resume_staging`].
    pub async fn resume_stuck_staging(&self, batch_id: &ExportBatchId) -> ExportResult<StageSummary> {
        self.pipeline.resume_staging(batch_id).await
    }

    /// Moves `STAGING_FAILED` tasks back to `STAGING`, then resumes.
    ///
    /// # Errors
    ///
    /// As [`ExportPipelineService::resume_staging`].
    pub async fn retry_failed_staging(&self, batch_id: &ExportBatchId) -> ExportResult<StageSummary> {
        let failed = self.members(batch_id, ExportStatus::StagingFailed).await?;
        let mut retried = 0_usize;
        for mut task in failed {
            let task_id = task.id();
            match self
                .pipeline
                .checkpoint(&mut task, |current, clock| current.retry_staging(clock))
                .await
            {
                Ok(()) => retried += 1,
                Err(err) => warn!(task_id = %task_id, error = %err, "Staging retry not recorded"),
            }
        }
        info!(export_batch_id = %batch_id, retried, "Failed staging queued for retry");
        self.pipeline.resume_staging(batch_id).await
    }

    /// Returns `DELIVERING` tasks to `STAGED`, then delivers to
    /// `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Destination`] before touching any task when
    /// the destination is not writable; otherwise as
    /// [`ExportPipelineService::deliver`].
    pub async fn resume_stuck_delivery(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
    ) -> ExportResult<DeliverySummary> {
        self.requeue_delivery(batch_id, destination, ExportStatus::Delivering)
            .await
    }

    /// Returns `DELIVERY_FAILED` tasks to `STAGED`, then delivers to
    /// `destination`.
    ///
    /// # Errors
    ///
    /// As [`Self::resume_stuck_delivery`].
    pub async fn retry_failed_delivery(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
    ) -> ExportResult<DeliverySummary> {
        self.requeue_delivery(batch_id, destination, ExportStatus::DeliveryFailed)
            .await
    }

    /// Clears the export state of unsettled tasks whose last pipeline move
    /// is at least `max_age_days` old, then removes staging containers that
    /// became empty.
    ///
    /// Container removal is best effort; failures are logged.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Tasks`] when the task store query fails.
    pub async fn cleanup_abandoned(&self, max_age_days: u32) -> ExportResult<CleanupSummary> {
        let now = self.pipeline.clock().utc();
        let Some(threshold) = cutoff(now, days(max_age_days)) else {
            return Ok(CleanupSummary::default());
        };
        let unsettled = self
            .pipeline
            .tasks()
            .query(&TaskQuery::all().with_export_statuses(&ExportStatus::UNSETTLED))
            .await?;

        let mut summary = CleanupSummary::default();
        let mut task_containers = BTreeSet::new();
        let mut batch_containers = BTreeSet::new();
        for mut task in unsettled {
            if reference_time(&task) > threshold {
                continue;
            }
            let task_id = task.id();
            match self.pipeline.manifest().latest_for_task(task_id).await {
                Ok(Some(row)) => {
                    task_containers.extend(row.task_container);
                    batch_containers.insert(row.batch_container);
                }
                Ok(None) => {}
                Err(err) => warn!(task_id = %task_id, error = %err, "Manifest lookup failed"),
            }
            match self
                .pipeline
                .checkpoint(&mut task, |current, clock| current.reset_export(clock))
                .await
            {
                Ok(()) => summary.reset_task_ids.push(task_id),
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "Abandoned task not reset");
                    summary
                        .failures
                        .push(TaskFailure::new(task_id, err.to_string()));
                }
            }
        }

        for container in task_containers.iter().chain(batch_containers.iter()) {
            match self.pipeline.transfer().remove_container_if_empty(container).await {
                Ok(true) => summary.removed_containers.push(container.clone()),
                Ok(false) => {}
                Err(err) => {
                    warn!(container = %container, error = %err, "Staging container not removed");
                }
            }
        }
        info!(
            max_age_days,
            reset = summary.reset_task_ids.len(),
            removed_containers = summary.removed_containers.len(),
            "Abandoned exports cleaned up"
        );
        Ok(summary)
    }

    /// Reports stuck, failed and abandoned tasks with a health score.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Tasks`] when the task store query fails.
    pub async fn recovery_status(&self) -> ExportResult<RecoveryStatus> {
        let now = self.pipeline.clock().utc();
        let stuck_cut = cutoff(now, self.config.stuck_after_delta());
        let abandoned_cut = cutoff(now, days(self.config.abandoned_after_days));
        let older_than = |task: &Task, cut: Option<DateTime<Utc>>| {
            cut.is_some_and(|limit| reference_time(task) <= limit)
        };

        let exported = self
            .pipeline
            .tasks()
            .query(&TaskQuery::all().with_export(StatusFilter::Present))
            .await?;
        let mut status = RecoveryStatus {
            stuck_staging: 0,
            stuck_delivery: 0,
            failed_staging: 0,
            failed_delivery: 0,
            abandoned: 0,
            batches: Vec::new(),
            health_score: 100,
            checked_at: now,
        };
        for task in &exported {
            let Some(export_status) = task.export().status() else {
                continue;
            };
            match export_status {
                ExportStatus::Staging if older_than(task, stuck_cut) => status.stuck_staging += 1,
                ExportStatus::Delivering if older_than(task, stuck_cut) => {
                    status.stuck_delivery += 1;
                }
                ExportStatus::StagingFailed => status.failed_staging += 1,
                ExportStatus::DeliveryFailed => status.failed_delivery += 1,
                _ => {}
            }
            if export_status.is_unsettled() && older_than(task, abandoned_cut) {
                status.abandoned += 1;
            }
        }
        status.batches = ExportBatch::group_tasks(&exported)
            .into_iter()
            .filter(|batch| batch.needs_attention() > 0)
            .collect();
        status.health_score = health_score(
            status.stuck_staging + status.stuck_delivery,
            status.failed_staging + status.failed_delivery,
            status.abandoned,
        );
        Ok(status)
    }

    /// Runs abandoned-task cleanup with the configured age and purges
    /// expired progress sessions.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when either step fails as a whole.
    pub async fn sweep(&self) -> ExportResult<SweepSummary> {
        let cleanup = self.cleanup_abandoned(self.config.abandoned_after_days).await?;
        let purged_sessions = self.pipeline.sessions().purge_expired().await?;
        Ok(SweepSummary {
            cleanup,
            purged_sessions,
        })
    }

    async fn members(&self, batch_id: &ExportBatchId, status: ExportStatus) -> ExportResult<Vec<Task>> {
        Ok(self
            .pipeline
            .tasks()
            .query(
                &TaskQuery::all()
                    .in_export_batch(batch_id)
                    .with_export_statuses(&[status]),
            )
            .await?)
    }

    async fn requeue_delivery(
        &self,
        batch_id: &ExportBatchId,
        destination: &ContainerRef,
        from: ExportStatus,
    ) -> ExportResult<DeliverySummary> {
        self.pipeline
            .transfer()
            .validate_writable(destination)
            .await
            .map_err(ExportError::Destination)?;
        let stranded = self.members(batch_id, from).await?;
        let mut requeued = 0_usize;
        for mut task in stranded {
            let task_id = task.id();
            match self
                .pipeline
                .checkpoint(&mut task, |current, clock| current.return_to_staged(clock))
                .await
            {
                Ok(()) => requeued += 1,
                Err(err) => warn!(task_id = %task_id, error = %err, "Task not returned to STAGED"),
            }
        }
        info!(
            export_batch_id = %batch_id,
            from = %from,
            requeued,
            "Delivery requeued"
        );
        self.pipeline.deliver(batch_id, destination).await
    }
}
