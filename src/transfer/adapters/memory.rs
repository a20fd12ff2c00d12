//! In-memory file-transfer adapter for tests and dry runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::transfer::{
    domain::{ContainerRef, DestinationInfo, FileRef, validate_entry_name},
    ports::{FileTransfer, TransferError, TransferResult},
};

type CopyCallback = dyn Fn(&FileRef) + Send + Sync;

/// Thread-safe in-memory container tree.
///
/// Child container references are formed as `parent/name`. Failures can be
/// injected per source container, per file name, or per destination, and a
/// callback can observe every successful copy.
#[derive(Clone, Default)]
pub struct InMemoryFileTransfer {
    state: Arc<RwLock<InMemoryTransferState>>,
    on_copy: Option<Arc<CopyCallback>>,
}

#[derive(Debug, Default)]
struct ContainerNode {
    parent: Option<ContainerRef>,
    files: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct InMemoryTransferState {
    containers: BTreeMap<ContainerRef, ContainerNode>,
    failing_sources: HashSet<ContainerRef>,
    failing_files: HashSet<String>,
    read_only: HashMap<ContainerRef, String>,
    copies: u64,
}

impl fmt::Debug for InMemoryFileTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFileTransfer")
            .field("state", &self.state)
            .field("on_copy", &self.on_copy.is_some())
            .finish()
    }
}

fn lock_error(err: impl ToString) -> TransferError {
    TransferError::backend(std::io::Error::other(err.to_string()))
}

fn child_ref(parent: &ContainerRef, name: &str) -> TransferResult<ContainerRef> {
    Ok(ContainerRef::new(format!("{parent}/{name}"))?)
}

impl InMemoryFileTransfer {
    /// Creates an empty transfer backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that invokes `callback` after every successful copy.
    #[must_use]
    pub fn with_copy_callback(mut self, callback: impl Fn(&FileRef) + Send + Sync + 'static) -> Self {
        self.on_copy = Some(Arc::new(callback));
        self
    }

    /// Adds a top-level container.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the reference is blank or the lock is
    /// poisoned.
    pub fn add_container(&self, id: &str) -> TransferResult<ContainerRef> {
        let container = ContainerRef::new(id)?;
        let mut state = self.state.write().map_err(lock_error)?;
        state.containers.entry(container.clone()).or_default();
        Ok(container)
    }

    /// Adds a file to an existing container.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::ContainerNotFound`] when the container is
    /// missing.
    pub fn add_file(&self, container: &ContainerRef, name: &str) -> TransferResult<FileRef> {
        let file_name = validate_entry_name(name)?.to_owned();
        let mut state = self.state.write().map_err(lock_error)?;
        let node = state
            .containers
            .get_mut(container)
            .ok_or_else(|| TransferError::ContainerNotFound(container.clone()))?;
        node.files.insert(file_name.clone());
        Ok(FileRef::new(container.clone(), file_name))
    }

    /// Returns the file names held by a container, or an empty list when the
    /// container does not exist.
    #[must_use]
    pub fn file_names(&self, container: &ContainerRef) -> Vec<String> {
        self.state
            .read()
            .ok()
            .and_then(|state| {
                state
                    .containers
                    .get(container)
                    .map(|node| node.files.iter().cloned().collect())
            })
            .unwrap_or_default()
    }

    /// Returns whether a container exists.
    #[must_use]
    pub fn has_container(&self, container: &ContainerRef) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.containers.contains_key(container))
    }

    /// Makes every copy out of `container` fail.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the lock is poisoned.
    pub fn fail_copies_from(&self, container: &ContainerRef) -> TransferResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failing_sources.insert(container.clone());
        Ok(())
    }

    /// Makes every copy of a file with this name fail.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the lock is poisoned.
    pub fn fail_file(&self, name: &str) -> TransferResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failing_files.insert(name.to_owned());
        Ok(())
    }

    /// Marks a container as rejecting writes.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the lock is poisoned.
    pub fn deny_writes(&self, container: &ContainerRef, reason: &str) -> TransferResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.read_only.insert(container.clone(), reason.to_owned());
        Ok(())
    }

    /// Returns how many copies have succeeded.
    #[must_use]
    pub fn copy_count(&self) -> u64 {
        self.state.read().map(|state| state.copies).unwrap_or_default()
    }
}

fn ensure_writable(state: &InMemoryTransferState, container: &ContainerRef) -> TransferResult<()> {
    if !state.containers.contains_key(container) {
        return Err(TransferError::ContainerNotFound(container.clone()));
    }
    match state.read_only.get(container) {
        Some(reason) => Err(TransferError::NotWritable {
            container: container.clone(),
            reason: reason.clone(),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl FileTransfer for InMemoryFileTransfer {
    async fn list_files(&self, container: &ContainerRef) -> TransferResult<Vec<FileRef>> {
        let state = self.state.read().map_err(lock_error)?;
        let node = state
            .containers
            .get(container)
            .ok_or_else(|| TransferError::ContainerNotFound(container.clone()))?;
        Ok(node
            .files
            .iter()
            .map(|name| FileRef::new(container.clone(), name.clone()))
            .collect())
    }

    async fn copy_file(
        &self,
        file: &FileRef,
        destination: &ContainerRef,
        new_name: &str,
    ) -> TransferResult<FileRef> {
        let target_name = validate_entry_name(new_name)?.to_owned();
        let copied = {
            let mut state = self.state.write().map_err(lock_error)?;
            let source_has_file = state
                .containers
                .get(file.container())
                .is_some_and(|node| node.files.contains(file.name()));
            if !source_has_file {
                return Err(TransferError::FileNotFound(file.clone()));
            }
            if state.failing_sources.contains(file.container())
                || state.failing_files.contains(file.name())
            {
                return Err(TransferError::CopyFailed {
                    file: file.clone(),
                    reason: "injected copy failure".to_owned(),
                });
            }
            ensure_writable(&state, destination)?;
            if let Some(node) = state.containers.get_mut(destination) {
                node.files.insert(target_name.clone());
            }
            state.copies += 1;
            FileRef::new(destination.clone(), target_name)
        };

        if let Some(callback) = &self.on_copy {
            callback(&copied);
        }
        Ok(copied)
    }

    async fn create_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<ContainerRef> {
        let child_name = validate_entry_name(name)?;
        let mut state = self.state.write().map_err(lock_error)?;
        ensure_writable(&state, parent)?;
        let child = child_ref(parent, child_name)?;
        state
            .containers
            .entry(child.clone())
            .or_insert_with(|| ContainerNode {
                parent: Some(parent.clone()),
                files: BTreeSet::new(),
            });
        Ok(child)
    }

    async fn find_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<Option<ContainerRef>> {
        let child_name = validate_entry_name(name)?;
        let state = self.state.read().map_err(lock_error)?;
        if !state.containers.contains_key(parent) {
            return Err(TransferError::ContainerNotFound(parent.clone()));
        }
        let child = child_ref(parent, child_name)?;
        Ok(state.containers.contains_key(&child).then_some(child))
    }

    async fn validate_writable(&self, container: &ContainerRef) -> TransferResult<DestinationInfo> {
        let state = self.state.read().map_err(lock_error)?;
        ensure_writable(&state, container)?;
        let name = container
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or(container.as_str())
            .to_owned();
        Ok(DestinationInfo {
            name,
            url: format!("memory://{container}"),
        })
    }

    async fn remove_container_if_empty(&self, container: &ContainerRef) -> TransferResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(node) = state.containers.get(container) else {
            return Ok(false);
        };
        let has_children = state
            .containers
            .values()
            .any(|candidate| candidate.parent.as_ref() == Some(container));
        if !node.files.is_empty() || has_children {
            return Ok(false);
        }
        state.containers.remove(container);
        Ok(true)
    }
}
