//! Local-directory file-transfer adapter.
//!
//! Containers are directories below a root opened through `cap-std`, so
//! every operation is confined to that root. Container references are
//! root-relative UTF-8 paths; the root itself is `.`.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;

use crate::transfer::{
    domain::{ContainerRef, DestinationInfo, FileRef, validate_entry_name},
    ports::{FileTransfer, TransferError, TransferResult},
};

const ROOT: &str = ".";
const PROBE_PREFIX: &str = ".stagehand-probe-";

/// File-transfer adapter backed by a local directory tree.
#[derive(Debug)]
pub struct LocalDirectoryTransfer {
    root: Dir,
    root_path: Utf8PathBuf,
}

impl LocalDirectoryTransfer {
    /// Opens `root` as the transfer root.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Backend`] when the directory cannot be opened.
    pub fn open(root: impl AsRef<Utf8Path>) -> TransferResult<Self> {
        let root_path = root.as_ref().to_path_buf();
        let dir = Dir::open_ambient_dir(&root_path, ambient_authority())
            .map_err(TransferError::backend)?;
        Ok(Self {
            root: dir,
            root_path,
        })
    }

    /// Returns the reference of the root container.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors [`ContainerRef::new`].
    pub fn root_container(&self) -> TransferResult<ContainerRef> {
        Ok(ContainerRef::new(ROOT)?)
    }

    /// Runs blocking filesystem work off the async executor.
    async fn blocking<T, F>(&self, work: F) -> TransferResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Dir) -> TransferResult<T> + Send + 'static,
    {
        let root = self.root.try_clone().map_err(TransferError::backend)?;
        tokio::task::spawn_blocking(move || work(root))
            .await
            .map_err(TransferError::backend)?
    }
}

fn open_container(root: &Dir, container: &ContainerRef) -> TransferResult<Dir> {
    if container.as_str() == ROOT {
        return root.try_clone().map_err(TransferError::backend);
    }
    root.open_dir(container.as_str()).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => TransferError::ContainerNotFound(container.clone()),
        _ => TransferError::backend(err),
    })
}

fn child_path(parent: &ContainerRef, name: &str) -> String {
    if parent.as_str() == ROOT {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

fn is_dir(dir: &Dir, name: &str) -> io::Result<bool> {
    match dir.metadata(name) {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl FileTransfer for LocalDirectoryTransfer {
    async fn list_files(&self, container: &ContainerRef) -> TransferResult<Vec<FileRef>> {
        let target = container.clone();
        self.blocking(move |root| {
            let dir = open_container(&root, &target)?;
            let mut names = Vec::new();
            for entry in dir.entries().map_err(TransferError::backend)? {
                let entry = entry.map_err(TransferError::backend)?;
                if entry.file_type().map_err(TransferError::backend)?.is_file() {
                    names.push(entry.file_name().map_err(TransferError::backend)?);
                }
            }
            names.sort();
            Ok(names
                .into_iter()
                .filter(|name| !name.starts_with(PROBE_PREFIX))
                .map(|name| FileRef::new(target.clone(), name))
                .collect())
        })
        .await
    }

    async fn copy_file(
        &self,
        file: &FileRef,
        destination: &ContainerRef,
        new_name: &str,
    ) -> TransferResult<FileRef> {
        let target_name = validate_entry_name(new_name)?.to_owned();
        let source = file.clone();
        let target = destination.clone();
        self.blocking(move |root| {
            let source_dir = open_container(&root, source.container())?;
            let destination_dir = open_container(&root, &target)?;
            source_dir
                .copy(source.name(), &destination_dir, &target_name)
                .map_err(|err| match err.kind() {
                    io::ErrorKind::NotFound => TransferError::FileNotFound(source.clone()),
                    io::ErrorKind::PermissionDenied => TransferError::NotWritable {
                        container: target.clone(),
                        reason: err.to_string(),
                    },
                    _ => TransferError::CopyFailed {
                        file: source.clone(),
                        reason: err.to_string(),
                    },
                })?;
            Ok(FileRef::new(target, target_name))
        })
        .await
    }

    async fn create_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<ContainerRef> {
        let child_name = validate_entry_name(name)?.to_owned();
        let parent_ref = parent.clone();
        self.blocking(move |root| {
            let parent_dir = open_container(&root, &parent_ref)?;
            match parent_dir.create_dir(&child_name) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                    return Err(TransferError::NotWritable {
                        container: parent_ref,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(TransferError::backend(err)),
            }
            Ok(ContainerRef::new(child_path(&parent_ref, &child_name))?)
        })
        .await
    }

    async fn find_container(
        &self,
        name: &str,
        parent: &ContainerRef,
    ) -> TransferResult<Option<ContainerRef>> {
        let child_name = validate_entry_name(name)?.to_owned();
        let parent_ref = parent.clone();
        self.blocking(move |root| {
            let parent_dir = open_container(&root, &parent_ref)?;
            if is_dir(&parent_dir, &child_name).map_err(TransferError::backend)? {
                Ok(Some(ContainerRef::new(child_path(&parent_ref, &child_name))?))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn validate_writable(&self, container: &ContainerRef) -> TransferResult<DestinationInfo> {
        let target = container.clone();
        let url = format!("file://{}", self.root_path.join(container.as_str()));
        self.blocking(move |root| {
            let dir = open_container(&root, &target)?;
            let probe = format!("{PROBE_PREFIX}{}", uuid::Uuid::new_v4());
            let not_writable = |err: io::Error| TransferError::NotWritable {
                container: target.clone(),
                reason: err.to_string(),
            };
            drop(dir.create(&probe).map_err(not_writable)?);
            dir.remove_file(&probe).map_err(not_writable)?;
            let name = Utf8Path::new(target.as_str())
                .file_name()
                .unwrap_or(target.as_str())
                .to_owned();
            Ok(DestinationInfo { name, url })
        })
        .await
    }

    async fn remove_container_if_empty(&self, container: &ContainerRef) -> TransferResult<bool> {
        if container.as_str() == ROOT {
            return Ok(false);
        }
        let target = container.clone();
        self.blocking(move |root| {
            let dir = match open_container(&root, &target) {
                Ok(dir) => dir,
                Err(TransferError::ContainerNotFound(_)) => return Ok(false),
                Err(err) => return Err(err),
            };
            let is_empty = dir
                .entries()
                .map_err(TransferError::backend)?
                .next()
                .is_none();
            if !is_empty {
                return Ok(false);
            }
            root.remove_dir(target.as_str())
                .map_err(TransferError::backend)?;
            Ok(true)
        })
        .await
    }
}
