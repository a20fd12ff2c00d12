//! In-memory property store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::settings::ports::{KeyedPropertyStore, PropertyStoreError, PropertyStoreResult};

/// Thread-safe in-memory property store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPropertyStore {
    values: Arc<RwLock<BTreeMap<String, String>>>,
}

impl InMemoryPropertyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }
}

fn lock_error(err: impl ToString) -> PropertyStoreError {
    PropertyStoreError::backend(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl KeyedPropertyStore for InMemoryPropertyStore {
    async fn get(&self, key: &str) -> PropertyStoreResult<Option<String>> {
        let values = self.values.read().map_err(lock_error)?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PropertyStoreResult<()> {
        let mut values = self.values.write().map_err(lock_error)?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> PropertyStoreResult<bool> {
        let mut values = self.values.write().map_err(lock_error)?;
        Ok(values.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> PropertyStoreResult<Vec<String>> {
        let values = self.values.read().map_err(lock_error)?;
        Ok(values
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
