//! When steps for export scenarios.

use super::world::{ExportWorld, run_async};
use rstest_bdd_macros::when;
use stagehand::export::domain::StagingFilters;
use stagehand::task::domain::ExportBatchId;

#[when(r#"the passed tasks are staged as "{batch_id}""#)]
fn stage_passed(world: &mut ExportWorld, batch_id: String) -> Result<(), eyre::Report> {
    let batch = ExportBatchId::new(batch_id)?;
    run_async(
        world
            .workflow
            .stage_tasks(&StagingFilters::passed_only(), Some(batch)),
    )
    .map_err(|failure| eyre::eyre!("{failure}"))?;
    Ok(())
}

#[when(r#"the batch "{batch_id}" is delivered"#)]
fn deliver(world: &mut ExportWorld, batch_id: String) -> Result<(), eyre::Report> {
    let batch = ExportBatchId::new(batch_id)?;
    let summary = run_async(
        world
            .workflow
            .deliver_batch(&batch, Some(&world.destination)),
    )
    .map_err(|failure| eyre::eyre!("{failure}"))?;
    world.last_delivery = Some(summary);
    Ok(())
}

#[when("{days:i64} days pass")]
fn days_pass(world: &mut ExportWorld, days: i64) {
    world.clock.advance(chrono::Duration::days(days));
}

#[when("abandoned exports older than {days:u32} days are cleaned up")]
fn cleanup(world: &mut ExportWorld, days: u32) -> Result<(), eyre::Report> {
    run_async(world.workflow.cleanup_abandoned(days))
        .map_err(|failure| eyre::eyre!("{failure}"))?;
    Ok(())
}
