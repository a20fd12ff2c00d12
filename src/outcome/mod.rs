//! Error taxonomy and response envelope shared by every exposed operation.
//!
//! Each layer keeps its own `thiserror` enum; this module defines the
//! common classification those enums map onto, and the structured failure
//! handed to callers once an error leaves the core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of failures crossing the core boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The addressed record does not exist.
    NotFound,
    /// The state has already been claimed by someone else.
    Conflict,
    /// The transition is illegal for the current status.
    InvalidState,
    /// Input was malformed or out of range.
    ValidationError,
    /// A copy or destination-access error.
    TransferFailure,
    /// A wall-clock budget was exceeded mid-batch.
    Timeout,
    /// The backing store failed.
    Persistence,
}

impl ErrorKind {
    /// Returns the canonical tag used in serialised failures.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidState => "invalid_state",
            Self::ValidationError => "validation_error",
            Self::TransferFailure => "transfer_failure",
            Self::Timeout => "timeout",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure carrying the kind tag and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct OperationFailure {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Rendered error message.
    pub message: String,
}

impl OperationFailure {
    /// Creates a failure with the given kind and message.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors that know their place in the shared taxonomy.
pub trait Classify: std::error::Error {
    /// Returns the taxonomy kind of this error.
    fn kind(&self) -> ErrorKind;

    /// Converts the error into a structured failure.
    fn to_failure(&self) -> OperationFailure {
        OperationFailure::new(self.kind(), self.to_string())
    }
}

/// Transport-neutral response shape: `{success, data, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Operation payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Structured failure otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationFailure>,
}

impl<T> From<Result<T, OperationFailure>> for Envelope<T> {
    fn from(result: Result<T, OperationFailure>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(failure) => Self {
                success: false,
                data: None,
                error: Some(failure),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn failed_envelope_serialises_kind_tag() {
        let envelope: Envelope<u32> =
            Err(OperationFailure::new(ErrorKind::Conflict, "task is held by a@x")).into();

        let value = serde_json::to_value(&envelope).expect("envelope serialises");

        assert_eq!(
            value,
            json!({
                "success": false,
                "error": {"kind": "conflict", "message": "task is held by a@x"}
            })
        );
    }

    #[rstest]
    fn successful_envelope_omits_error() {
        let envelope: Envelope<u32> = Ok(7).into();

        let value = serde_json::to_value(&envelope).expect("envelope serialises");

        assert_eq!(value, json!({"success": true, "data": 7}));
    }
}
