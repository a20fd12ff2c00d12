//! End-to-end export tests over the in-memory adapters.

use crate::in_memory::helpers::{Setup, setup};
use rstest::rstest;
use stagehand::export::domain::{SessionStatus, StagingFilters};
use stagehand::task::domain::{ExportBatchId, ExportStatus};
use stagehand::transfer::domain::ContainerRef;

fn batch() -> ExportBatchId {
    ExportBatchId::new("batch_a").expect("valid batch id")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn staged_and_delivered_batch_reports_progress(setup: Setup) {
    setup
        .passed_task("task_001", &["object.glb", "alignment.json", "raw_video.mp4"])
        .await;
    setup.passed_task("task_002", &["object.glb"]).await;

    let staged = setup
        .workflow
        .stage_tasks(&StagingFilters::passed_only(), Some(batch()))
        .await
        .expect("staging should run");
    assert_eq!(staged.staged, 2);

    let delivered = setup
        .workflow
        .deliver_batch(&batch(), Some(&setup.destination))
        .await
        .expect("delivery should run");
    assert!(delivered.is_complete());
    assert_eq!(delivered.files_copied, 3);

    let progress = setup
        .workflow
        .get_export_progress(&delivered.session_id.to_string())
        .await
        .expect("session should be readable");
    assert_eq!(progress.status, SessionStatus::Completed);
    assert_eq!(progress.succeeded, 2);

    let batches = setup.workflow.list_batches().await.expect("list batches");
    let listed = batches.first().expect("one batch");
    assert!(listed.is_fully_delivered());
    assert_eq!(
        setup
            .transfer
            .file_names(&ContainerRef::new("client/task_001").expect("valid ref")),
        vec!["alignment.json".to_owned(), "object.glb".to_owned()]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_staging_is_retried_once_files_arrive(setup: Setup) {
    let task = setup.passed_task("task_001", &[]).await;
    let first = setup
        .workflow
        .stage_tasks(&StagingFilters::passed_only(), Some(batch()))
        .await
        .expect("staging should run");
    assert_eq!(first.failed, 1);

    setup
        .transfer
        .add_file(task.source_container(), "object.glb")
        .expect("source file should be created");
    let retried = setup
        .workflow
        .retry_staging(&batch())
        .await
        .expect("retry should run");

    assert_eq!(retried.staged, 1);
    let reloaded = setup.workflow.get_task(task.id()).await.expect("reload");
    assert_eq!(reloaded.export().status(), Some(ExportStatus::Staged));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_resets_abandoned_work(setup: Setup) {
    let task = setup.passed_task("task_001", &[]).await;
    setup
        .workflow
        .stage_tasks(&StagingFilters::passed_only(), Some(batch()))
        .await
        .expect("staging should run");
    setup.clock.advance(chrono::Duration::days(8));

    let before = setup
        .workflow
        .get_recovery_status()
        .await
        .expect("status should load");
    assert_eq!(before.abandoned, 1);

    let swept = setup.workflow.sweep().await.expect("sweep should run");

    assert_eq!(swept.cleanup.reset_task_ids, vec![task.id()]);
    let reloaded = setup.workflow.get_task(task.id()).await.expect("reload");
    assert_eq!(reloaded.export().status(), None);
    let after = setup
        .workflow
        .get_recovery_status()
        .await
        .expect("status should load");
    assert_eq!(after.health_score, 100);
}
