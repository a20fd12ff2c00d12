//! The three status dimensions carried by every task.

use super::ParseStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn normalize(value: &str) -> String {
    value.trim().to_ascii_uppercase().replace([' ', '-'], "_")
}

/// Primary work state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    /// Waiting for an agent.
    Open,
    /// Held by an agent.
    InProgress,
    /// Work submitted.
    Complete,
    /// Sent back for another attempt.
    Rework,
    /// Set aside for administrative attention.
    Flagged,
}

impl WorkStatus {
    /// Every work status, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Complete,
        Self::Rework,
        Self::Flagged,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
            Self::Rework => "REWORK",
            Self::Flagged => "FLAGGED",
        }
    }

    /// Returns whether an agent may claim a task in this state.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        matches!(self, Self::Open | Self::Rework)
    }

    /// Returns whether work may be submitted from this state.
    #[must_use]
    pub const fn accepts_completion(self) -> bool {
        matches!(self, Self::InProgress | Self::Rework)
    }
}

impl TryFrom<&str> for WorkStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize(value).as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETE" => Ok(Self::Complete),
            "REWORK" => Ok(Self::Rework),
            "FLAGGED" => Ok(Self::Flagged),
            _ => Err(ParseStatusError {
                dimension: "work",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality-gate state attached to submitted work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// Awaiting a reviewer.
    Pending,
    /// Accepted.
    Passed,
    /// Rejected and sent back.
    Failed,
}

impl ReviewStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }

    /// Returns the canonical representation of an optional status.
    #[must_use]
    pub const fn label(status: Option<Self>) -> &'static str {
        match status {
            Some(value) => value.as_str(),
            None => "none",
        }
    }
}

impl TryFrom<&str> for ReviewStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize(value).as_str() {
            "PENDING" => Ok(Self::Pending),
            "PASSED" => Ok(Self::Passed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ParseStatusError {
                dimension: "review",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staging and delivery progress. Absence (`None`) means never exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    /// Artefacts are being copied to the staging area.
    Staging,
    /// Artefacts are staged and awaiting delivery.
    Staged,
    /// No artefact could be staged.
    StagingFailed,
    /// Staged artefacts are being copied to the destination.
    Delivering,
    /// Delivered to the destination.
    Delivered,
    /// Delivery failed for this task.
    DeliveryFailed,
}

impl ExportStatus {
    /// Every export status, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Staging,
        Self::Staged,
        Self::StagingFailed,
        Self::Delivering,
        Self::Delivered,
        Self::DeliveryFailed,
    ];

    /// Statuses left behind by an interrupted or failed run.
    pub const UNSETTLED: [Self; 4] = [
        Self::Staging,
        Self::StagingFailed,
        Self::Delivering,
        Self::DeliveryFailed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staging => "STAGING",
            Self::Staged => "STAGED",
            Self::StagingFailed => "STAGING_FAILED",
            Self::Delivering => "DELIVERING",
            Self::Delivered => "DELIVERED",
            Self::DeliveryFailed => "DELIVERY_FAILED",
        }
    }

    /// Returns the canonical representation of an optional status.
    #[must_use]
    pub const fn label(status: Option<Self>) -> &'static str {
        match status {
            Some(value) => value.as_str(),
            None => "none",
        }
    }

    /// Returns whether the status is left behind by an interrupted or failed
    /// run and therefore subject to recovery.
    #[must_use]
    pub const fn is_unsettled(self) -> bool {
        matches!(
            self,
            Self::Staging | Self::StagingFailed | Self::Delivering | Self::DeliveryFailed
        )
    }

    /// Returns whether a task in this status must never be re-selected for
    /// staging.
    #[must_use]
    pub const fn blocks_reselection(self) -> bool {
        matches!(self, Self::Staged | Self::Delivered)
    }

    /// Returns whether the export state machine allows `from -> to`.
    ///
    /// `None` stands for "never exported"; returning to `None` is the
    /// abandonment reset and is only allowed from unsettled statuses.
    #[must_use]
    pub const fn can_transition(from: Option<Self>, to: Option<Self>) -> bool {
        match (from, to) {
            (None, Some(Self::Staging))
            | (
                Some(Self::Staging),
                Some(Self::Staged | Self::StagingFailed),
            )
            | (Some(Self::StagingFailed), Some(Self::Staging))
            | (Some(Self::Staged), Some(Self::Delivering))
            | (
                Some(Self::Delivering),
                Some(Self::Delivered | Self::DeliveryFailed | Self::Staged),
            )
            | (Some(Self::DeliveryFailed), Some(Self::Delivering | Self::Staged)) => true,
            (Some(current), None) => current.is_unsettled(),
            _ => false,
        }
    }
}

impl TryFrom<&str> for ExportStatus {
    type Error = ParseStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match normalize(value).as_str() {
            "STAGING" => Ok(Self::Staging),
            "STAGED" => Ok(Self::Staged),
            "STAGING_FAILED" => Ok(Self::StagingFailed),
            "DELIVERING" => Ok(Self::Delivering),
            "DELIVERED" => Ok(Self::Delivered),
            "DELIVERY_FAILED" => Ok(Self::DeliveryFailed),
            _ => Err(ParseStatusError {
                dimension: "export",
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
