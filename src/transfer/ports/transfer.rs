//! File-transfer port: list, copy, create and validate containers.

use crate::outcome::{Classify, ErrorKind};
use crate::transfer::domain::{ContainerRef, DestinationInfo, FileRef, InvalidNameError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for file-transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Contract for the storage backend that holds task artefacts.
///
/// No timeout wraps an individual call; a stalled adapter stalls the caller.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Lists the files directly inside a container, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ContainerNotFound`] when the container does
    /// not exist.
    async fn list_files(&self, container: &ContainerRef) -> TransferResult<Vec<FileRef>>;

    /// Copies `file` into `destination` under `new_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the source is missing, the destination
    /// is not writable, or the backend fails mid-copy.
    async fn copy_file(
        &self,
        file: &FileRef,
        destination: &ContainerRef,
        new_name: &str,
    ) -> TransferResult<FileRef>;

    /// Creates a child container, returning the existing one when a child
    /// with the same name is already present.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the parent is missing or not writable.
    async fn create_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<ContainerRef>;

    /// Finds a child container by name.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ContainerNotFound`] when the parent does not
    /// exist.
    async fn find_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<Option<ContainerRef>>;

    /// Confirms the container exists and accepts writes.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ContainerNotFound`] or
    /// [`TransferError::NotWritable`].
    async fn validate_writable(&self, container: &ContainerRef) -> TransferResult<DestinationInfo>;

    /// Removes a container holding neither files nor child containers.
    ///
    /// Returns `false` when the container is missing or not empty.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Backend`] when removal fails.
    async fn remove_container_if_empty(&self, container: &ContainerRef) -> TransferResult<bool>;
}

/// Errors returned by file-transfer adapters.
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// The container does not exist.
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerRef),

    /// The file does not exist in its container.
    #[error("file not found: {0}")]
    FileNotFound(FileRef),

    /// The container exists but rejects writes.
    #[error("container {container} is not writable: {reason}")]
    NotWritable {
        /// Container that rejected the write.
        container: ContainerRef,
        /// Backend explanation.
        reason: String,
    },

    /// The copy itself failed.
    #[error("failed to copy {file}: {reason}")]
    CopyFailed {
        /// File being copied.
        file: FileRef,
        /// Backend explanation.
        reason: String,
    },

    /// A container or file name is unusable.
    #[error(transparent)]
    InvalidName(#[from] InvalidNameError),

    /// Generic backend failure.
    #[error("transfer backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl TransferError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

impl Classify for TransferError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName(_) => ErrorKind::ValidationError,
            _ => ErrorKind::TransferFailure,
        }
    }
}
