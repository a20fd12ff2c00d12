//! Error types for the export pipeline, session tracker and recovery.

use crate::export::domain::SessionId;
use crate::export::ports::ManifestError;
use crate::outcome::{Classify, ErrorKind};
use crate::settings::ports::PropertyStoreError;
use crate::task::domain::TaskDomainError;
use crate::task::ports::TaskRepositoryError;
use crate::transfer::ports::TransferError;
use std::sync::Arc;
use thiserror::Error;

/// Result type for session tracker operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by the session tracker.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The session does not exist or has expired.
    #[error("export session not found: {0}")]
    NotFound(SessionId),

    /// The caller supplied a malformed session id.
    #[error("invalid export session id '{0}'")]
    InvalidId(String),

    /// A stored snapshot could not be encoded or decoded.
    #[error("export session {key} is not valid JSON: {source}")]
    Serialization {
        /// Property-store key.
        key: String,
        /// Underlying serde error.
        source: Arc<serde_json::Error>,
    },

    /// The property store failed.
    #[error(transparent)]
    Store(#[from] PropertyStoreError),
}

impl SessionError {
    pub(crate) fn serialization(key: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            source: Arc::new(err),
        }
    }
}

impl Classify for SessionError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidId(_) => ErrorKind::ValidationError,
            Self::Serialization { .. } | Self::Store(_) => ErrorKind::Persistence,
        }
    }
}

/// Result type for export pipeline and recovery operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that abort an export operation as a whole.
///
/// Per-task failures never surface here; they are reported in the run
/// summary instead.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// The staging area or destination is unusable; no task was touched.
    #[error("destination unavailable: {0}")]
    Destination(#[source] TransferError),

    /// A batch-level transfer call failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Task persistence failed outside per-task processing.
    #[error(transparent)]
    Tasks(#[from] TaskRepositoryError),

    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// The manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The progress session could not be persisted.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The staging container template failed to render.
    #[error("invalid staging container template: {0}")]
    Template(String),
}

impl Classify for ExportError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Destination(_) => ErrorKind::TransferFailure,
            Self::Transfer(err) => err.kind(),
            Self::Tasks(err) => err.kind(),
            Self::Domain(err) => err.kind(),
            Self::Manifest(err) => err.kind(),
            Self::Session(err) => err.kind(),
            Self::Template(_) => ErrorKind::ValidationError,
        }
    }
}
