//! Operation surface tests: failure kinds, envelopes and settings.

use crate::in_memory::helpers::{AGENT, REVIEWER, Setup, ports, setup};
use rstest::rstest;
use serde_json::json;
use stagehand::export::domain::StagingFilters;
use stagehand::outcome::{Envelope, ErrorKind};
use stagehand::settings::{
    Settings, adapters::InMemoryPropertyStore, keys, ports::KeyedPropertyStore,
};
use stagehand::task::{
    domain::{ExportBatchId, NewTask, ReviewStatus, TaskId, WorkStatus},
    services::{OverrideReviewRequest, ReviewTaskRequest},
};
use stagehand::transfer::domain::ContainerRef;
use stagehand::workflow::Workflow;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_task_is_not_found(setup: Setup) {
    let failure = setup
        .workflow
        .get_task(TaskId::new())
        .await
        .expect_err("unknown task should fail");

    assert_eq!(failure.kind, ErrorKind::NotFound);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_operation_serialises_to_envelope(setup: Setup) {
    let task = setup.passed_task("task_001", &["object.glb"]).await;

    let result = setup.workflow.assign_task(task.id(), AGENT).await;
    let envelope: Envelope<_> = result.map(|assigned| assigned.id()).into();
    let value = serde_json::to_value(&envelope).expect("envelope serialises");

    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error"]["kind"], json!("invalid_state"));
    assert!(value.get("data").is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn invalid_agent_email_is_a_validation_error(setup: Setup) {
    let task = setup.passed_task("task_001", &[]).await;
    let fields = NewTask::new("import_1", "group-a", "task_002", task.source_container().clone())
        .expect("valid fields");
    let fresh = setup.workflow.create_task(fields).await.expect("create");

    let failure = setup
        .workflow
        .assign_task(fresh.id(), "not-an-email")
        .await
        .expect_err("malformed email should fail");

    assert_eq!(failure.kind, ErrorKind::ValidationError);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn manual_override_to_failed_sends_work_back(setup: Setup) {
    let task = setup.passed_task("task_001", &[]).await;

    let overridden = setup
        .workflow
        .manual_review_override(OverrideReviewRequest::new(
            task.id(),
            ReviewStatus::Failed,
            REVIEWER,
        )
        .with_override_mode(true))
        .await
        .expect("override should succeed");

    assert_eq!(overridden.review_status(), Some(ReviewStatus::Failed));
    assert_eq!(overridden.work_status(), WorkStatus::Rework);
    assert_eq!(overridden.revision_count(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn out_of_range_score_is_rejected(setup: Setup) {
    let task = setup.passed_task("task_001", &[]).await;

    let failure = setup
        .workflow
        .review_task(ReviewTaskRequest::new(task.id(), 101, REVIEWER))
        .await
        .expect_err("score above 100 should fail");

    assert_eq!(failure.kind, ErrorKind::ValidationError);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn flagged_task_reopens_unassigned(setup: Setup) {
    let source = setup
        .transfer
        .add_container("sources/task_010")
        .expect("source container");
    let fields = NewTask::new("import_1", "group-a", "task_010", source).expect("valid fields");
    let task = setup.workflow.create_task(fields).await.expect("create");
    setup
        .workflow
        .assign_task(task.id(), AGENT)
        .await
        .expect("assign");

    let flagged = setup.workflow.flag_task(task.id()).await.expect("flag");
    assert_eq!(flagged.work_status(), WorkStatus::Flagged);
    assert!(flagged.assignee().is_none());

    let reopened = setup.workflow.reopen_task(task.id()).await.expect("reopen");
    assert_eq!(reopened.work_status(), WorkStatus::Open);

    let again = setup
        .workflow
        .reopen_task(task.id())
        .await
        .expect_err("open task cannot be reopened");
    assert_eq!(again.kind, ErrorKind::InvalidState);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delivery_without_destination_is_a_validation_error(setup: Setup) {
    let batch = ExportBatchId::new("batch_a").expect("valid batch id");

    let failure = setup
        .workflow
        .deliver_batch(&batch, None)
        .await
        .expect_err("delivery needs a destination");

    assert_eq!(failure.kind, ErrorKind::ValidationError);
}

#[tokio::test(flavor = "multi_thread")]
async fn delivery_falls_back_to_the_default_destination() {
    let setup = Setup::with_settings(InMemoryPropertyStore::new(), |root| {
        let mut settings = Settings::defaults(root);
        settings.default_destination = Some(ContainerRef::new("client").expect("valid ref"));
        settings
    });
    setup.passed_task("task_001", &["object.glb"]).await;
    let batch = ExportBatchId::new("batch_a").expect("valid batch id");
    setup
        .workflow
        .stage_tasks(&StagingFilters::passed_only(), Some(batch.clone()))
        .await
        .expect("staging should run");

    let summary = setup
        .workflow
        .deliver_batch(&batch, None)
        .await
        .expect("delivery should use the default destination");

    assert_eq!(summary.delivered, 1);
    assert_eq!(
        setup
            .transfer
            .file_names(&ContainerRef::new("client/task_001").expect("valid ref")),
        vec!["object.glb".to_owned()]
    );
}

#[rstest]
#[case("not-a-uuid", ErrorKind::ValidationError)]
#[case("0b0f8a52-8a51-4d4f-9a8e-2d7b1d0c7a11", ErrorKind::NotFound)]
#[tokio::test(flavor = "multi_thread")]
async fn export_progress_lookup_failures(
    setup: Setup,
    #[case] session_id: &str,
    #[case] expected: ErrorKind,
) {
    let failure = setup
        .workflow
        .get_export_progress(session_id)
        .await
        .expect_err("lookup should fail");

    assert_eq!(failure.kind, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_stored_setting_fails_workflow_load() {
    let setup = Setup::with_settings(
        InMemoryPropertyStore::with_entries([(keys::EXPORT_CHUNK_SIZE, "lots")]),
        Settings::defaults,
    );

    let result = Workflow::load(
        ports(&setup.transfer, &setup.properties, &setup.clock),
        setup.staging_root.clone(),
    )
    .await;

    let failure = result.err().expect("load should reject the setting");
    assert_eq!(failure.kind, ErrorKind::ValidationError);
    assert!(failure.message.contains(keys::EXPORT_CHUNK_SIZE));
}

#[tokio::test(flavor = "multi_thread")]
async fn stored_pass_threshold_changes_review_outcome() {
    let setup = Setup::with_settings(InMemoryPropertyStore::new(), Settings::defaults);
    setup
        .properties
        .set(keys::REVIEW_PASS_THRESHOLD, "95")
        .await
        .expect("store should accept the threshold");
    let workflow = Workflow::load(
        ports(&setup.transfer, &setup.properties, &setup.clock),
        setup.staging_root.clone(),
    )
    .await
    .expect("settings should load");

    assert_eq!(workflow.lifecycle().policy().pass_threshold.value(), 95);
}
