//! Shared fixtures for in-memory workflow tests.

use std::sync::Arc;

use rstest::fixture;
use stagehand::export::adapters::InMemoryManifestRepository;
use stagehand::settings::{Settings, adapters::InMemoryPropertyStore};
use stagehand::task::{
    adapters::InMemoryTaskRepository,
    domain::{Artifacts, NewTask, Task},
    services::{CompleteTaskRequest, ReviewTaskRequest},
};
use stagehand::testing::ManualClock;
use stagehand::transfer::{adapters::InMemoryFileTransfer, domain::ContainerRef};
use stagehand::workflow::{Workflow, WorkflowPorts};

/// Agent used by the fixtures.
pub const AGENT: &str = "a@x.com";
/// Reviewer used by the fixtures.
pub const REVIEWER: &str = "r@x.com";

/// Workflow over the in-memory adapters.
pub type TestWorkflow = Workflow<
    InMemoryTaskRepository,
    InMemoryFileTransfer,
    InMemoryManifestRepository,
    InMemoryPropertyStore,
    ManualClock,
>;

/// Ports and handles behind a [`TestWorkflow`].
pub struct Setup {
    pub transfer: Arc<InMemoryFileTransfer>,
    pub properties: Arc<InMemoryPropertyStore>,
    pub clock: ManualClock,
    pub staging_root: ContainerRef,
    pub destination: ContainerRef,
    pub workflow: TestWorkflow,
}

impl Setup {
    /// Builds ports for `properties` and wires a workflow with `settings`.
    pub fn with_settings(
        properties: InMemoryPropertyStore,
        settings: impl FnOnce(ContainerRef) -> Settings,
    ) -> Self {
        let clock = ManualClock::at_epoch();
        let transfer = Arc::new(InMemoryFileTransfer::new());
        let staging_root = transfer
            .add_container("staging")
            .expect("staging root should be created");
        let destination = transfer
            .add_container("client")
            .expect("destination should be created");
        let shared = Arc::new(properties);
        let mut configured = settings(staging_root.clone());
        configured.export.chunk_pause = std::time::Duration::ZERO;
        let workflow = Workflow::new(ports(&transfer, &shared, &clock), configured);
        Self {
            transfer,
            properties: shared,
            clock,
            staging_root,
            destination,
            workflow,
        }
    }

    /// Creates a passed task whose source holds `files`.
    pub async fn passed_task(&self, folder: &str, files: &[&str]) -> Task {
        let source = self
            .transfer
            .add_container(&format!("sources/{folder}"))
            .expect("source container should be created");
        for name in files {
            self.transfer
                .add_file(&source, name)
                .expect("source file should be created");
        }
        let fields = NewTask::new("import_1", "group-a", folder, source).expect("valid fields");
        let task = self.workflow.create_task(fields).await.expect("create");
        self.workflow
            .assign_task(task.id(), AGENT)
            .await
            .expect("assign");
        let artifacts = Artifacts::new()
            .with_object("object.glb")
            .with_alignment("alignment.json");
        self.workflow
            .complete_task(CompleteTaskRequest::new(task.id(), AGENT, artifacts))
            .await
            .expect("complete");
        self.workflow
            .review_task(ReviewTaskRequest::new(task.id(), 90, REVIEWER))
            .await
            .expect("review");
        self.clock.advance(chrono::Duration::seconds(1));
        self.workflow.get_task(task.id()).await.expect("reload")
    }
}

/// Fresh ports over shared handles.
pub fn ports(
    transfer: &Arc<InMemoryFileTransfer>,
    properties: &Arc<InMemoryPropertyStore>,
    clock: &ManualClock,
) -> WorkflowPorts<
    InMemoryTaskRepository,
    InMemoryFileTransfer,
    InMemoryManifestRepository,
    InMemoryPropertyStore,
    ManualClock,
> {
    WorkflowPorts {
        tasks: Arc::new(InMemoryTaskRepository::new()),
        transfer: Arc::clone(transfer),
        manifest: Arc::new(InMemoryManifestRepository::new()),
        properties: Arc::clone(properties),
        clock: Arc::new(clock.clone()),
    }
}

/// Workflow with default settings and no stored overrides.
#[fixture]
pub fn setup() -> Setup {
    Setup::with_settings(InMemoryPropertyStore::new(), Settings::defaults)
}
