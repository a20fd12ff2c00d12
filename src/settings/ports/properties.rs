//! Keyed property store port.

use crate::outcome::{Classify, ErrorKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for property store operations.
pub type PropertyStoreResult<T> = Result<T, PropertyStoreError>;

/// Process-wide string key/value store.
#[async_trait]
pub trait KeyedPropertyStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> PropertyStoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> PropertyStoreResult<()>;

    /// Removes `key`, returning whether it was present.
    async fn delete(&self, key: &str) -> PropertyStoreResult<bool>;

    /// Lists keys starting with `prefix`, in lexical order.
    async fn keys_with_prefix(&self, prefix: &str) -> PropertyStoreResult<Vec<String>>;
}

/// Errors returned by property store implementations.
#[derive(Debug, Clone, Error)]
pub enum PropertyStoreError {
    /// Backend failure.
    #[error("property store error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl PropertyStoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

impl Classify for PropertyStoreError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Persistence
    }
}
