//! Tests for status enums and validated value types.

use crate::task::domain::{
    EmailAddress, ExportBatchId, ExportStatus, FolderName, ReviewScore, ReviewStatus,
    TaskDomainError, WorkStatus,
};
use crate::testing::ManualClock;
use rstest::rstest;

#[rstest]
#[case("OPEN", WorkStatus::Open)]
#[case("in_progress", WorkStatus::InProgress)]
#[case(" Complete ", WorkStatus::Complete)]
#[case("REWORK", WorkStatus::Rework)]
#[case("flagged", WorkStatus::Flagged)]
fn work_status_parses_canonical_and_loose_forms(#[case] raw: &str, #[case] expected: WorkStatus) {
    assert_eq!(WorkStatus::try_from(raw), Ok(expected));
}

#[test]
fn unknown_status_strings_are_rejected() {
    assert!(WorkStatus::try_from("DONE").is_err());
    assert!(ReviewStatus::try_from("MAYBE").is_err());
    assert!(ExportStatus::try_from("EXPORTED").is_err());
}

#[rstest]
#[case(ExportStatus::StagingFailed, "STAGING_FAILED")]
#[case(ExportStatus::DeliveryFailed, "DELIVERY_FAILED")]
#[case(ExportStatus::Delivering, "DELIVERING")]
fn export_status_round_trips_through_storage_string(
    #[case] status: ExportStatus,
    #[case] stored: &str,
) {
    assert_eq!(status.as_str(), stored);
    assert_eq!(ExportStatus::try_from(stored), Ok(status));
}

#[rstest]
#[case(None, Some(ExportStatus::Staging), true)]
#[case(None, Some(ExportStatus::Staged), false)]
#[case(Some(ExportStatus::Staging), Some(ExportStatus::Staged), true)]
#[case(Some(ExportStatus::Staging), Some(ExportStatus::StagingFailed), true)]
#[case(Some(ExportStatus::Staging), Some(ExportStatus::Delivering), false)]
#[case(Some(ExportStatus::StagingFailed), Some(ExportStatus::Staging), true)]
#[case(Some(ExportStatus::Staged), Some(ExportStatus::Delivering), true)]
#[case(Some(ExportStatus::Staged), Some(ExportStatus::Staging), false)]
#[case(Some(ExportStatus::Delivering), Some(ExportStatus::Delivered), true)]
#[case(Some(ExportStatus::Delivering), Some(ExportStatus::DeliveryFailed), true)]
#[case(Some(ExportStatus::Delivering), Some(ExportStatus::Staged), true)]
#[case(Some(ExportStatus::DeliveryFailed), Some(ExportStatus::Delivering), true)]
#[case(Some(ExportStatus::DeliveryFailed), Some(ExportStatus::Staged), true)]
#[case(Some(ExportStatus::Delivered), Some(ExportStatus::Delivering), false)]
#[case(Some(ExportStatus::Delivered), None, false)]
#[case(Some(ExportStatus::Staged), None, false)]
#[case(Some(ExportStatus::Staging), None, true)]
#[case(Some(ExportStatus::DeliveryFailed), None, true)]
fn export_transition_table(
    #[case] from: Option<ExportStatus>,
    #[case] to: Option<ExportStatus>,
    #[case] expected: bool,
) {
    assert_eq!(ExportStatus::can_transition(from, to), expected);
}

#[rstest]
#[case(ExportStatus::Staged, true)]
#[case(ExportStatus::Delivered, true)]
#[case(ExportStatus::Staging, false)]
#[case(ExportStatus::DeliveryFailed, false)]
fn reselection_is_blocked_only_after_successful_phases(
    #[case] status: ExportStatus,
    #[case] expected: bool,
) {
    assert_eq!(status.blocks_reselection(), expected);
}

#[test]
fn email_is_trimmed_and_lower_cased() {
    let parsed = EmailAddress::new("  Alice@Example.COM ").expect("email should parse");
    assert_eq!(parsed.as_str(), "alice@example.com");
}

#[rstest]
#[case("")]
#[case("no-at-sign")]
#[case("@example.com")]
#[case("alice@")]
#[case("a@b@c")]
fn malformed_emails_are_rejected(#[case] raw: &str) {
    assert!(matches!(
        EmailAddress::new(raw),
        Err(TaskDomainError::InvalidEmail(_))
    ));
}

#[rstest]
#[case(0, true)]
#[case(80, true)]
#[case(100, true)]
#[case(101, false)]
#[case(1000, false)]
fn review_scores_are_bounded(#[case] raw: u16, #[case] valid: bool) {
    assert_eq!(ReviewScore::new(raw).is_ok(), valid);
}

#[rstest]
#[case("nested/folder")]
#[case("..")]
#[case("")]
fn folder_names_reject_path_tricks(#[case] raw: &str) {
    assert!(FolderName::new(raw).is_err());
}

#[rstest]
#[case("batch_20240101_000000_abcdef12", true)]
#[case("client-export", true)]
#[case("has space", false)]
#[case("slash/inside", false)]
#[case("", false)]
fn export_batch_ids_are_validated(#[case] raw: &str, #[case] valid: bool) {
    assert_eq!(ExportBatchId::new(raw).is_ok(), valid);
}

#[test]
fn generated_batch_ids_embed_the_clock_time() {
    let clock = ManualClock::at_epoch();
    let generated = ExportBatchId::generate(&clock);

    assert!(generated.as_str().starts_with("batch_20240101_000000_"));
    assert_eq!(generated.as_str().len(), "batch_20240101_000000_".len() + 8);
    assert!(ExportBatchId::new(generated.as_str()).is_ok());
}

#[rstest]
#[case(None, "none")]
#[case(Some(ReviewStatus::Pending), "PENDING")]
#[case(Some(ReviewStatus::Failed), "FAILED")]
fn review_status_label_covers_absence(#[case] status: Option<ReviewStatus>, #[case] expected: &str) {
    assert_eq!(ReviewStatus::label(status), expected);
}
