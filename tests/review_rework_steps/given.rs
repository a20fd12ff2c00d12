//! Given steps for review and rework scenarios.

use super::world::{ReviewWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use stagehand::task::domain::NewTask;
use stagehand::transfer::domain::ContainerRef;

#[given("an open task")]
fn open_task(world: &mut ReviewWorld) -> Result<(), eyre::Report> {
    let fields = NewTask::new(
        "import_1",
        "group-a",
        "task_001",
        ContainerRef::new("sources/task_001")?,
    )?;
    let created = run_async(world.workflow.create_task(fields)).wrap_err("create task")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"the task is assigned to "{agent}""#)]
fn task_assigned(world: &mut ReviewWorld, agent: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let assigned =
        run_async(world.workflow.assign_task(task_id, &agent)).wrap_err("assign task")?;
    world.task = Some(assigned);
    Ok(())
}
