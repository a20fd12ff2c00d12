//! Review sub-state recorded on a task.

use super::{EmailAddress, ReviewScore, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review status together with the score, reviewer and time that set it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Current review status; `None` means never submitted for review.
    pub status: Option<ReviewStatus>,
    /// Last recorded score.
    pub score: Option<ReviewScore>,
    /// Last recorded reviewer.
    pub reviewer: Option<EmailAddress>,
    /// Last recorded review time.
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Records a verdict with its score, reviewer and time.
    pub fn record(
        &mut self,
        status: ReviewStatus,
        score: Option<ReviewScore>,
        reviewer: EmailAddress,
        at: DateTime<Utc>,
    ) {
        self.status = Some(status);
        self.score = score;
        self.reviewer = Some(reviewer);
        self.reviewed_at = Some(at);
    }

    /// Returns the review to `PENDING`, clearing score, reviewer and time.
    pub fn reset_to_pending(&mut self) {
        self.status = Some(ReviewStatus::Pending);
        self.score = None;
        self.reviewer = None;
        self.reviewed_at = None;
    }

    /// Returns whether `agent` recorded the current failing verdict.
    #[must_use]
    pub fn failed_by(&self, agent: &EmailAddress) -> bool {
        self.status == Some(ReviewStatus::Failed) && self.reviewer.as_ref() == Some(agent)
    }
}

/// Verdict produced by a scored review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The score met the threshold.
    Passed,
    /// The score fell short; the task went back for rework.
    Failed {
        /// Revision number appended for the failed attempt.
        revision_number: u32,
    },
}
