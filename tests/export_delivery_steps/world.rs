//! Shared world state for export BDD scenarios.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use rstest::fixture;
use stagehand::export::{adapters::InMemoryManifestRepository, domain::DeliverySummary};
use stagehand::settings::{adapters::InMemoryPropertyStore, keys, ports::KeyedPropertyStore};
use stagehand::task::{
    adapters::InMemoryTaskRepository,
    domain::{ExportBatchId, ExportStatus, Task},
    ports::{TaskQuery, TaskRepository},
};
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

/// Scenario world for export behaviour tests.
pub struct ExportWorld {
    pub tasks: Arc<InMemoryTaskRepository>,
    pub transfer: Arc<InMemoryFileTransfer>,
    pub manifest: Arc<InMemoryManifestRepository>,
    pub properties: Arc<InMemoryPropertyStore>,
    pub clock: ManualClock,
    pub copy_delay_secs: Arc<AtomicI64>,
    pub workflow: TestWorkflow,
    pub staging_root: ContainerRef,
    pub destination: ContainerRef,
    pub last_delivery: Option<DeliverySummary>,
}

impl ExportWorld {
    /// Creates a world whose copies advance the clock by a configurable
    /// delay.
    #[must_use]
    pub fn new() -> Self {
        let clock = ManualClock::at_epoch();
        let copy_delay_secs = Arc::new(AtomicI64::new(0));
        let ticking = clock.clone();
        let delay = Arc::clone(&copy_delay_secs);
        let transfer = Arc::new(InMemoryFileTransfer::new().with_copy_callback(move |_| {
            ticking.advance(chrono::Duration::seconds(delay.load(Ordering::SeqCst)));
        }));
        let staging_root = transfer
            .add_container("staging")
            .expect("staging root should be created");
        let destination = transfer
            .add_container("client")
            .expect("destination should be created");
        let properties = Arc::new(InMemoryPropertyStore::with_entries([(
            keys::EXPORT_CHUNK_PAUSE_MS,
            "0",
        )]));
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let manifest = Arc::new(InMemoryManifestRepository::new());
        let ports = WorkflowPorts {
            tasks: Arc::clone(&tasks),
            transfer: Arc::clone(&transfer),
            manifest: Arc::clone(&manifest),
            properties: Arc::clone(&properties),
            clock: Arc::new(clock.clone()),
        };
        let workflow = run_async(Workflow::load(ports, staging_root.clone()))
            .expect("default settings should load");
        Self {
            tasks,
            transfer,
            manifest,
            properties,
            clock,
            copy_delay_secs,
            workflow,
            staging_root,
            destination,
            last_delivery: None,
        }
    }

    /// Stores a setting and rebuilds the workflow from the property store.
    pub fn configure(&mut self, key: &str, value: &str) -> Result<(), eyre::Report> {
        run_async(self.properties.set(key, value))?;
        let ports = WorkflowPorts {
            tasks: Arc::clone(&self.tasks),
            transfer: Arc::clone(&self.transfer),
            manifest: Arc::clone(&self.manifest),
            properties: Arc::clone(&self.properties),
            clock: Arc::new(self.clock.clone()),
        };
        self.workflow = run_async(Workflow::load(ports, self.staging_root.clone()))
            .map_err(|failure| eyre::eyre!("{failure}"))?;
        Ok(())
    }

    /// Returns the members of `batch_id` at `status`.
    pub fn members(
        &self,
        batch_id: &ExportBatchId,
        status: Option<ExportStatus>,
    ) -> Result<Vec<Task>, eyre::Report> {
        let mut query = TaskQuery::all().in_export_batch(batch_id);
        if let Some(wanted) = status {
            query = query.with_export_statuses(&[wanted]);
        }
        Ok(run_async(self.tasks.query(&query))?)
    }
}

impl Default for ExportWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ExportWorld {
    ExportWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
