//! Recovery status report and health score.

use super::ExportBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reporting-only snapshot of tasks needing recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStatus {
    /// Tasks at `STAGING` longer than the stuck threshold.
    pub stuck_staging: usize,
    /// Tasks at `DELIVERING` longer than the stuck threshold.
    pub stuck_delivery: usize,
    /// Tasks at `STAGING_FAILED`.
    pub failed_staging: usize,
    /// Tasks at `DELIVERY_FAILED`.
    pub failed_delivery: usize,
    /// Unsettled tasks older than the abandonment threshold.
    pub abandoned: usize,
    /// Batches with members needing attention.
    pub batches: Vec<ExportBatch>,
    /// Composite score in `0..=100`; higher is healthier.
    pub health_score: u8,
    /// When the report was produced.
    pub checked_at: DateTime<Utc>,
}

/// Computes `100 - (5 * stuck + 2 * failed + 10 * abandoned)`, floored at 0.
#[must_use]
pub fn health_score(stuck: usize, failed: usize, abandoned: usize) -> u8 {
    let penalty = stuck
        .saturating_mul(5)
        .saturating_add(failed.saturating_mul(2))
        .saturating_add(abandoned.saturating_mul(10));
    let remaining = 100_usize.saturating_sub(penalty);
    u8::try_from(remaining).unwrap_or(u8::MAX)
}
