//! Then steps for review and rework scenarios.

use super::world::{ReviewWorld, run_async};
use rstest_bdd_macros::then;
use stagehand::task::domain::{ReviewStatus, WorkStatus};

/// Reloads the task so assertions see the persisted state.
fn refreshed(world: &ReviewWorld) -> Result<stagehand::task::domain::Task, eyre::Report> {
    let task_id = world.task()?.id();
    run_async(world.workflow.get_task(task_id)).map_err(|failure| eyre::eyre!("{failure}"))
}

#[then(r#"the review status is "{status}""#)]
fn review_status_is(world: &ReviewWorld, status: String) -> Result<(), eyre::Report> {
    let expected = ReviewStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = refreshed(world)?;
    if task.review_status() != Some(expected) {
        return Err(eyre::eyre!(
            "expected review status {expected}, found {}",
            ReviewStatus::label(task.review_status())
        ));
    }
    Ok(())
}

#[then(r#"the work status is "{status}""#)]
fn work_status_is(world: &ReviewWorld, status: String) -> Result<(), eyre::Report> {
    let expected = WorkStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = refreshed(world)?;
    if task.work_status() != expected {
        return Err(eyre::eyre!(
            "expected work status {expected}, found {}",
            task.work_status()
        ));
    }
    Ok(())
}

#[then("the revision count is {count:usize}")]
fn revision_count_is(world: &ReviewWorld, count: usize) -> Result<(), eyre::Report> {
    let task = refreshed(world)?;
    let numbers: Vec<u32> = task
        .revisions()
        .iter()
        .map(|entry| entry.revision_number())
        .collect();
    let expected: Vec<u32> = (1..=u32::try_from(count)?).collect();
    if task.revision_count() != count || numbers != expected {
        return Err(eyre::eyre!(
            "expected {count} revisions numbered 1..={count}, found {numbers:?}"
        ));
    }
    Ok(())
}

#[then(r#"the assignee is "{agent}""#)]
fn assignee_is(world: &ReviewWorld, agent: String) -> Result<(), eyre::Report> {
    let task = refreshed(world)?;
    let assignee = task.assignee().map(|email| email.as_str().to_owned());
    if assignee.as_deref() != Some(agent.as_str()) {
        return Err(eyre::eyre!("expected assignee {agent}, found {assignee:?}"));
    }
    Ok(())
}

#[then(r#"the operation fails with "{kind}""#)]
fn operation_fails_with(world: &ReviewWorld, kind: String) -> Result<(), eyre::Report> {
    let failure = world
        .last_failure
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the operation to fail"))?;
    if failure.kind.as_str() != kind {
        return Err(eyre::eyre!("expected a {kind} failure, got {failure}"));
    }
    Ok(())
}

#[then("the review time is unchanged since the last failed review")]
fn review_time_unchanged(world: &ReviewWorld) -> Result<(), eyre::Report> {
    let task = refreshed(world)?;
    let recorded = task.review_record().reviewed_at;
    if recorded.is_none() || recorded != world.failed_review_time {
        return Err(eyre::eyre!(
            "expected review time {:?}, found {recorded:?}",
            world.failed_review_time
        ));
    }
    Ok(())
}
