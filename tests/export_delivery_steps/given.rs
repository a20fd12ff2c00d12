//! Given steps for export scenarios.

use super::world::{ExportWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use stagehand::settings::keys;
use stagehand::task::{
    domain::{Artifacts, NewTask},
    services::{CompleteTaskRequest, ReviewTaskRequest},
};
use std::sync::atomic::Ordering;

const AGENT: &str = "a@x.com";
const REVIEWER: &str = "r@x.com";

fn seed_passed(world: &ExportWorld, count: usize, files: &[&str]) -> Result<(), eyre::Report> {
    for index in 1..=count {
        let folder = format!("task_{index:03}");
        let source = world.transfer.add_container(&format!("sources/{folder}"))?;
        for name in files {
            world.transfer.add_file(&source, name)?;
        }
        let workflow = &world.workflow;
        let task = run_async(workflow.create_task(NewTask::new("import_1", "group-a", folder, source)?))
            .map_err(|failure| eyre::eyre!("{failure}"))?;
        run_async(async {
            workflow.assign_task(task.id(), AGENT).await?;
            let artifacts = Artifacts::new()
                .with_object("object.glb")
                .with_alignment("alignment.json");
            workflow
                .complete_task(CompleteTaskRequest::new(task.id(), AGENT, artifacts))
                .await?;
            workflow
                .review_task(ReviewTaskRequest::new(task.id(), 95, REVIEWER))
                .await
        })
        .map_err(|failure| eyre::eyre!("{failure}"))
        .wrap_err("prepare passed task")?;
        world.clock.advance(chrono::Duration::seconds(1));
    }
    Ok(())
}

#[given("{count:usize} passed tasks with source files")]
fn passed_tasks_with_files(world: &mut ExportWorld, count: usize) -> Result<(), eyre::Report> {
    seed_passed(world, count, &["object.glb", "alignment.json", "raw_video.mp4"])
}

#[given("{count:usize} passed tasks with no source files")]
fn passed_tasks_without_files(world: &mut ExportWorld, count: usize) -> Result<(), eyre::Report> {
    seed_passed(world, count, &[])
}

#[given("a delivery budget of {seconds:u64} seconds")]
fn delivery_budget(world: &mut ExportWorld, seconds: u64) -> Result<(), eyre::Report> {
    world.configure(keys::EXPORT_DELIVERY_BUDGET_SECS, &seconds.to_string())
}

#[given("every file copy takes {seconds:i64} seconds")]
fn copy_delay(world: &mut ExportWorld, seconds: i64) {
    world.copy_delay_secs.store(seconds, Ordering::SeqCst);
}
