//! Review policy applied by the lifecycle service.

use crate::task::domain::{ReviewScore, TaskDomainError};

/// Default minimum passing score.
pub const DEFAULT_PASS_THRESHOLD: u8 = 80;

/// Pass/fail rule for scored reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPolicy {
    /// A review passes iff its score is at least this value.
    pub pass_threshold: ReviewScore,
}

impl ReviewPolicy {
    /// Creates a policy with the given threshold.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::ScoreOutOfRange`] when `pass_threshold`
    /// exceeds 100.
    pub fn new(pass_threshold: u16) -> Result<Self, TaskDomainError> {
        Ok(Self {
            pass_threshold: ReviewScore::new(pass_threshold)?,
        })
    }

    /// Returns whether `score` passes.
    #[must_use]
    pub fn passes(&self, score: ReviewScore) -> bool {
        score >= self.pass_threshold
    }
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: ReviewScore::saturating(DEFAULT_PASS_THRESHOLD),
        }
    }
}
