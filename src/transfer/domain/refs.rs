//! Opaque container and file references.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a container or file name is unusable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid container or file name: '{0}'")]
pub struct InvalidNameError(pub String);

/// Validates a single path segment used as a container or file name.
///
/// # Errors
///
/// Returns [`InvalidNameError`] when the name is empty, is `.` or `..`, or
/// contains a path separator.
pub fn validate_entry_name(name: &str) -> Result<&str, InvalidNameError> {
    let trimmed = name.trim();
    let is_valid = !trimmed.is_empty()
        && trimmed != "."
        && trimmed != ".."
        && !trimmed.contains(['/', '\\']);
    if is_valid {
        Ok(trimmed)
    } else {
        Err(InvalidNameError(name.to_owned()))
    }
}

/// Backend-specific identifier of a container (folder).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerRef(String);

impl ContainerRef {
    /// Creates a container reference.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidNameError`] when the reference is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidNameError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(InvalidNameError(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the reference as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContainerRef {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContainerRef> for String {
    fn from(value: ContainerRef) -> Self {
        value.0
    }
}

impl AsRef<str> for ContainerRef {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    container: ContainerRef,
    name: String,
}

impl FileRef {
    /// Creates a file reference.
    #[must_use]
    pub fn new(container: ContainerRef, name: impl Into<String>) -> Self {
        Self {
            container,
            name: name.into(),
        }
    }

    /// Returns the owning container.
    #[must_use]
    pub const fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

/// Result of a successful write-access check on a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationInfo {
    /// Display name of the destination container.
    pub name: String,
    /// Backend URL of the destination container.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("task_0042", true)]
    #[case("  padded  ", true)]
    #[case("", false)]
    #[case("..", false)]
    #[case("nested/name", false)]
    #[case("win\\name", false)]
    fn validate_entry_name_rejects_path_like_values(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_entry_name(name).is_ok(), valid);
    }

    #[rstest]
    fn container_ref_rejects_blank_values() {
        assert!(ContainerRef::new("   ").is_err());
        assert_eq!(
            ContainerRef::new(" staging ").map(|c| c.as_str().to_owned()),
            Ok("staging".to_owned())
        );
    }
}
