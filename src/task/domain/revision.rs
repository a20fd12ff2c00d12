//! Append-only ledger of prior completed attempts.

use super::{Artifacts, EmailAddress, ReviewScore, TaskDomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored reason length in characters.
pub const MAX_REASON_CHARS: usize = 500;

/// Reason recorded when a rework request carries none.
pub const DEFAULT_REWORK_REASON: &str = "No reason provided";

/// Immutable snapshot of an attempt captured when work is sent back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    revision_number: u32,
    agent: Option<EmailAddress>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    artifacts: Artifacts,
    time_taken_secs: Option<u64>,
    review_score: Option<ReviewScore>,
    reviewed_by: Option<EmailAddress>,
    reviewed_at: Option<DateTime<Utc>>,
    reason: String,
    recorded_at: DateTime<Utc>,
}

/// Snapshot contents before a revision number is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionDraft {
    /// Agent who produced the attempt.
    pub agent: Option<EmailAddress>,
    /// When the attempt started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the attempt was submitted.
    pub completed_at: Option<DateTime<Utc>>,
    /// Artefacts of the attempt.
    pub artifacts: Artifacts,
    /// Time spent on the attempt.
    pub time_taken_secs: Option<u64>,
    /// Score that sent the attempt back, if reviewed.
    pub review_score: Option<ReviewScore>,
    /// Reviewer, if reviewed.
    pub reviewed_by: Option<EmailAddress>,
    /// Review time, if reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Why the attempt was sent back.
    pub reason: String,
    /// When the snapshot was taken.
    pub recorded_at: DateTime<Utc>,
}

impl RevisionEntry {
    /// Returns the 1-based revision number.
    #[must_use]
    pub const fn revision_number(&self) -> u32 {
        self.revision_number
    }

    /// Returns the agent who produced the attempt.
    #[must_use]
    pub const fn agent(&self) -> Option<&EmailAddress> {
        self.agent.as_ref()
    }

    /// Returns when the attempt started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the attempt was submitted.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the artefacts of the attempt.
    #[must_use]
    pub const fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Returns time spent on the attempt.
    #[must_use]
    pub const fn time_taken_secs(&self) -> Option<u64> {
        self.time_taken_secs
    }

    /// Returns the failing review score, if any.
    #[must_use]
    pub const fn review_score(&self) -> Option<ReviewScore> {
        self.review_score
    }

    /// Returns the reviewer, if any.
    #[must_use]
    pub const fn reviewed_by(&self) -> Option<&EmailAddress> {
        self.reviewed_by.as_ref()
    }

    /// Returns the review time, if any.
    #[must_use]
    pub const fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    /// Returns the reason the attempt was sent back.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Clamps a reason to [`MAX_REASON_CHARS`], substituting the default for
/// blank input.
#[must_use]
pub fn normalize_reason(reason: Option<&str>) -> String {
    let trimmed = reason.map(str::trim).filter(|value| !value.is_empty());
    match trimmed {
        Some(value) => value.chars().take(MAX_REASON_CHARS).collect(),
        None => DEFAULT_REWORK_REASON.to_owned(),
    }
}

/// Ordered, append-only revision ledger.
///
/// Entries are numbered `1..=n` in insertion order; numbering is assigned on
/// append and re-validated whenever a ledger is deserialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RevisionEntry>", into = "Vec<RevisionEntry>")]
pub struct RevisionHistory(Vec<RevisionEntry>);

impl RevisionHistory {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a snapshot and returns the revision number assigned to it.
    pub fn append(&mut self, draft: RevisionDraft) -> u32 {
        let revision_number = self.next_number();
        self.0.push(RevisionEntry {
            revision_number,
            agent: draft.agent,
            started_at: draft.started_at,
            completed_at: draft.completed_at,
            artifacts: draft.artifacts,
            time_taken_secs: draft.time_taken_secs,
            review_score: draft.review_score,
            reviewed_by: draft.reviewed_by,
            reviewed_at: draft.reviewed_at,
            reason: draft.reason.chars().take(MAX_REASON_CHARS).collect(),
            recorded_at: draft.recorded_at,
        });
        revision_number
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the ledger is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&RevisionEntry> {
        self.0.last()
    }

    /// Iterates entries in revision order.
    pub fn iter(&self) -> impl Iterator<Item = &RevisionEntry> {
        self.0.iter()
    }

    /// Returns the entries as a slice.
    #[must_use]
    pub fn entries(&self) -> &[RevisionEntry] {
        &self.0
    }

    fn next_number(&self) -> u32 {
        u32::try_from(self.0.len()).map_or(u32::MAX, |count| count.saturating_add(1))
    }
}

impl TryFrom<Vec<RevisionEntry>> for RevisionHistory {
    type Error = TaskDomainError;

    fn try_from(entries: Vec<RevisionEntry>) -> Result<Self, Self::Error> {
        for (expected, entry) in (1_u32..).zip(&entries) {
            if entry.revision_number != expected {
                return Err(TaskDomainError::InvalidRevisionHistory(format!(
                    "entry at position {expected} is numbered {}",
                    entry.revision_number
                )));
            }
        }
        Ok(Self(entries))
    }
}

impl From<RevisionHistory> for Vec<RevisionEntry> {
    fn from(history: RevisionHistory) -> Self {
        history.0
    }
}
