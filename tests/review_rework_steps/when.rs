//! When steps for review and rework scenarios.

use super::world::{ReviewWorld, run_async};
use chrono::Duration;
use eyre::WrapErr;
use rstest_bdd_macros::when;
use stagehand::task::{
    domain::{Artifacts, ReviewOutcome},
    services::{CompleteTaskRequest, ReviewTaskRequest},
};

fn artifacts() -> Artifacts {
    Artifacts::new()
        .with_object("object.glb")
        .with_alignment("alignment.json")
}

#[when(r#""{agent}" completes the task"#)]
fn agent_completes(world: &mut ReviewWorld, agent: String) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::minutes(30));
    let task_id = world.task()?.id();
    let completed = run_async(
        world
            .workflow
            .complete_task(CompleteTaskRequest::new(task_id, agent, artifacts())),
    )
    .wrap_err("complete task")?;
    world.task = Some(completed);
    Ok(())
}

#[when(r#""{reviewer}" reviews the task with score {score:u16}"#)]
fn reviewer_scores(
    world: &mut ReviewWorld,
    reviewer: String,
    score: u16,
) -> Result<(), eyre::Report> {
    world.clock.advance(Duration::minutes(5));
    let task_id = world.task()?.id();
    let result = run_async(
        world
            .workflow
            .review_task(ReviewTaskRequest::new(task_id, score, reviewer)),
    )
    .wrap_err("review task")?;
    if matches!(result.outcome, ReviewOutcome::Failed { .. }) {
        world.failed_review_time = result.task.review_record().reviewed_at;
    }
    world.task = Some(result.task);
    Ok(())
}

#[when(r#""{agent}" tries to claim the task"#)]
fn agent_tries_to_claim(world: &mut ReviewWorld, agent: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    match run_async(world.workflow.assign_task(task_id, &agent)) {
        Ok(task) => world.task = Some(task),
        Err(failure) => world.last_failure = Some(failure),
    }
    Ok(())
}

#[when(r#""{reviewer}" tries to review the task with score {score:u16}"#)]
fn reviewer_tries_to_score(
    world: &mut ReviewWorld,
    reviewer: String,
    score: u16,
) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    match run_async(
        world
            .workflow
            .review_task(ReviewTaskRequest::new(task_id, score, reviewer)),
    ) {
        Ok(result) => world.task = Some(result.task),
        Err(failure) => world.last_failure = Some(failure),
    }
    Ok(())
}
