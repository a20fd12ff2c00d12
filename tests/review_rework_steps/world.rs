//! Shared world state for review and rework BDD scenarios.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rstest::fixture;
use stagehand::export::adapters::InMemoryManifestRepository;
use stagehand::outcome::OperationFailure;
use stagehand::settings::{Settings, adapters::InMemoryPropertyStore};
use stagehand::task::{adapters::InMemoryTaskRepository, domain::Task};
use stagehand::testing::ManualClock;
use stagehand::transfer::{adapters::InMemoryFileTransfer, domain::ContainerRef};
use stagehand::workflow::{Workflow, WorkflowPorts};

/// Workflow type used by the BDD world.
pub type TestWorkflow = Workflow<
    InMemoryTaskRepository,
    InMemoryFileTransfer,
    InMemoryManifestRepository,
    InMemoryPropertyStore,
    ManualClock,
>;

/// Scenario world for review behaviour tests.
pub struct ReviewWorld {
    pub workflow: TestWorkflow,
    pub clock: ManualClock,
    pub task: Option<Task>,
    pub last_failure: Option<OperationFailure>,
    pub failed_review_time: Option<DateTime<Utc>>,
}

impl ReviewWorld {
    /// Creates a world backed by in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let clock = ManualClock::at_epoch();
        let staging_root = ContainerRef::new("staging").expect("staging root should be valid");
        let ports = WorkflowPorts {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            transfer: Arc::new(InMemoryFileTransfer::new()),
            manifest: Arc::new(InMemoryManifestRepository::new()),
            properties: Arc::new(InMemoryPropertyStore::new()),
            clock: Arc::new(clock.clone()),
        };
        Self {
            workflow: Workflow::new(ports, Settings::defaults(staging_root)),
            clock,
            task: None,
            last_failure: None,
            failed_review_time: None,
        }
    }

    /// Returns the task under test.
    pub fn task(&self) -> Result<&Task, eyre::Report> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for ReviewWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReviewWorld {
    ReviewWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
