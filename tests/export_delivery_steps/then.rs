//! Then steps for export scenarios.

use super::world::{ExportWorld, run_async};
use rstest_bdd_macros::then;
use stagehand::task::domain::{ExportBatchId, ExportStatus};

#[then(r#"the batch "{batch_id}" has {count:usize} tasks at "{status}""#)]
fn batch_has_tasks_at(
    world: &ExportWorld,
    batch_id: String,
    count: usize,
    status: String,
) -> Result<(), eyre::Report> {
    let batch = ExportBatchId::new(batch_id)?;
    let wanted = ExportStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let members = world.members(&batch, Some(wanted))?;
    if members.len() != count {
        return Err(eyre::eyre!(
            "expected {count} tasks at {wanted}, found {}",
            members.len()
        ));
    }
    Ok(())
}

#[then(r#"no task belongs to the batch "{batch_id}""#)]
fn batch_is_empty(world: &ExportWorld, batch_id: String) -> Result<(), eyre::Report> {
    let batch = ExportBatchId::new(batch_id)?;
    let members = world.members(&batch, None)?;
    if !members.is_empty() {
        return Err(eyre::eyre!("expected no members, found {}", members.len()));
    }
    Ok(())
}

#[then("the last delivery timed out")]
fn delivery_timed_out(world: &ExportWorld) -> Result<(), eyre::Report> {
    let summary = world
        .last_delivery
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no delivery has run"))?;
    if !summary.timed_out || summary.timeout_failure().is_none() {
        return Err(eyre::eyre!("expected a timed-out delivery, got {summary:?}"));
    }
    Ok(())
}

#[then("the last delivery completed")]
fn delivery_completed(world: &ExportWorld) -> Result<(), eyre::Report> {
    let summary = world
        .last_delivery
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no delivery has run"))?;
    if !summary.is_complete() {
        return Err(eyre::eyre!("expected a complete delivery, got {summary:?}"));
    }
    Ok(())
}

#[then("the health score is {score:u8}")]
fn health_score_is(world: &ExportWorld, score: u8) -> Result<(), eyre::Report> {
    let status = run_async(world.workflow.get_recovery_status())
        .map_err(|failure| eyre::eyre!("{failure}"))?;
    if status.health_score != score {
        return Err(eyre::eyre!(
            "expected health score {score}, found {}",
            status.health_score
        ));
    }
    Ok(())
}
