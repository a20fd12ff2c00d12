//! Unit tests for the export bounded context.


use std::sync::Arc;

use crate::export::{
    adapters::InMemoryManifestRepository,
    domain::ManifestRow,
    ports::{ManifestRepository, ManifestResult},
    services::{
        ExportConfig, ExportPipelineService, RecoveryConfig, RecoveryService, SessionTracker,
        staging_folder_name,
    },
};
use crate::settings::adapters::InMemoryPropertyStore;
use crate::task::{
    adapters::InMemoryTaskRepository,
    domain::{
        Artifacts, Completion, EmailAddress, ExportBatchId, NewTask, ReviewScore, ScoredReview,
        Task, TaskId,
    },
    ports::TaskRepository,
};
use crate::testing::ManualClock;
use crate::transfer::{
    adapters::InMemoryFileTransfer,
    domain::{ContainerRef, DestinationInfo, FileRef},
    ports::{FileTransfer, TransferResult},
};
use async_trait::async_trait;
use mockall::mock;

pub(super) const AGENT: &str = "a@x.com";
pub(super) const REVIEWER: &str = "r@x.com";
pub(super) const STAGING_ROOT: &str = "staging";
pub(super) const DESTINATION: &str = "client";

pub(super) type TestPipeline = ExportPipelineService<
    InMemoryTaskRepository,
    InMemoryFileTransfer,
    InMemoryManifestRepository,
    InMemoryPropertyStore,
    ManualClock,
>;

pub(super) type TestRecovery = RecoveryService<
    InMemoryTaskRepository,
    InMemoryFileTransfer,
    InMemoryManifestRepository,
    InMemoryPropertyStore,
    ManualClock,
>;

mock! {
    pub Manifest {}

    #[async_trait]
    impl ManifestRepository for Manifest {
        async fn record(&self, row: &ManifestRow) -> ManifestResult<()>;
        async fn latest_for_task(&self, task_id: TaskId) -> ManifestResult<Option<ManifestRow>>;
        async fn rows_for_batch(&self, batch_id: &ExportBatchId) -> ManifestResult<Vec<ManifestRow>>;
    }
}

mock! {
    pub Transfer {}

    #[async_trait]
    impl FileTransfer for Transfer {
        async fn list_files(&self, container: &ContainerRef) -> TransferResult<Vec<FileRef>>;
        async fn copy_file(
            &self,
            file: &FileRef,
            destination: &ContainerRef,
            new_name: &str,
        ) -> TransferResult<FileRef>;
        async fn create_container(
            &self,
            name: &str,
            parent: &ContainerRef,
        ) -> TransferResult<ContainerRef>;
        async fn find_container(
            &self,
            name: &str,
            parent: &ContainerRef,
        ) -> TransferResult<Option<ContainerRef>>;
        async fn validate_writable(&self, container: &ContainerRef) -> TransferResult<DestinationInfo>;
        async fn remove_container_if_empty(&self, container: &ContainerRef) -> TransferResult<bool>;
    }
}

/// In-memory wiring of the pipeline with handles on every adapter.
pub(super) struct Harness {
    pub(super) tasks: Arc<InMemoryTaskRepository>,
    pub(super) transfer: Arc<InMemoryFileTransfer>,
    pub(super) manifest: Arc<InMemoryManifestRepository>,
    pub(super) clock: ManualClock,
    pub(super) pipeline: TestPipeline,
    pub(super) staging_root: ContainerRef,
    pub(super) destination: ContainerRef,
}

impl Harness {
    pub(super) fn new() -> Self {
        let clock = ManualClock::at_epoch();
        Self::build(InMemoryFileTransfer::new(), clock, |config| config)
    }

    pub(super) fn build(
        transfer: InMemoryFileTransfer,
        clock: ManualClock,
        configure: impl FnOnce(ExportConfig) -> ExportConfig,
    ) -> Self {
        let staging_root = transfer
            .add_container(STAGING_ROOT)
            .expect("staging root should be created");
        let destination = transfer
            .add_container(DESTINATION)
            .expect("destination should be created");
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let transfer = Arc::new(transfer);
        let manifest = Arc::new(InMemoryManifestRepository::new());
        let shared_clock = Arc::new(clock.clone());
        let pipeline = ExportPipelineService::new(
            Arc::clone(&tasks),
            Arc::clone(&transfer),
            Arc::clone(&manifest),
            SessionTracker::new(Arc::new(InMemoryPropertyStore::new()), Arc::clone(&shared_clock)),
            shared_clock,
            configure(ExportConfig::for_tests(staging_root.clone())),
        );
        Self {
            tasks,
            transfer,
            manifest,
            clock,
            pipeline,
            staging_root,
            destination,
        }
    }

    pub(super) fn recovery(&self) -> TestRecovery {
        RecoveryService::new(self.pipeline.clone(), RecoveryConfig::default())
    }

    /// Stores a completed task whose source container holds `files`.
    pub(super) async fn seed_completed(&self, folder: &str, files: &[&str]) -> eyre::Result<Task> {
        self.seed_with_artifacts(folder, files, full_artifacts()).await
    }

    pub(super) async fn seed_with_artifacts(
        &self,
        folder: &str,
        files: &[&str],
        artifacts: Artifacts,
    ) -> eyre::Result<Task> {
        self.seed_in_group("group-a", folder, files, artifacts).await
    }

    /// Stores a completed task of `group` whose source lives under
    /// `sources/<group>/<folder>`.
    pub(super) async fn seed_in_group(
        &self,
        group: &str,
        folder: &str,
        files: &[&str],
        artifacts: Artifacts,
    ) -> eyre::Result<Task> {
        let source = self.transfer.add_container(&format!("sources/{group}/{folder}"))?;
        for name in files {
            self.transfer.add_file(&source, name)?;
        }
        let mut task = Task::new(NewTask::new("import_1", group, folder, source)?, &self.clock);
        task.assign(email(AGENT), &self.clock)?;
        task.complete(Completion::new(artifacts), email(AGENT), &self.clock)?;
        self.tasks.store(&task).await?;
        self.clock.advance(chrono::Duration::seconds(1));
        Ok(task)
    }

    /// Stores a completed task whose review passed.
    pub(super) async fn seed_passed(&self, folder: &str, files: &[&str]) -> eyre::Result<Task> {
        let mut task = self.seed_completed(folder, files).await?;
        task.review(passing_review(), &self.clock)?;
        Ok(self.tasks.update(&task).await?)
    }

    pub(super) async fn task(&self, task_id: TaskId) -> eyre::Result<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| eyre::eyre!("task {task_id} should exist"))
    }

    pub(super) fn staged_folder(&self, batch_id: &ExportBatchId, task: &Task) -> ContainerRef {
        let folder = staging_folder_name(task);
        ContainerRef::new(format!("{}/{batch_id}/{folder}", self.staging_root))
            .expect("staged folder reference should be valid")
    }

    pub(super) fn delivered_folder(&self, folder: &str) -> ContainerRef {
        ContainerRef::new(format!("{}/{folder}", self.destination))
            .expect("delivered folder reference should be valid")
    }
}

pub(super) fn email(value: &str) -> EmailAddress {
    EmailAddress::new(value).expect("test email should be valid")
}

pub(super) fn batch(value: &str) -> ExportBatchId {
    ExportBatchId::new(value).expect("test batch id should be valid")
}

pub(super) fn full_artifacts() -> Artifacts {
    Artifacts::new()
        .with_object("object.glb")
        .with_alignment("alignment.json")
}

pub(super) fn passing_review() -> ScoredReview {
    ScoredReview {
        score: ReviewScore::saturating(95),
        reviewer: email(REVIEWER),
        threshold: ReviewScore::saturating(80),
        feedback: None,
    }
}
