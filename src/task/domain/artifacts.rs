//! Production artefacts attached to submitted work.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of production artefact recorded on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The produced object file.
    Object,
    /// The alignment file.
    Alignment,
    /// The video list.
    VideoList,
}

impl ArtifactKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Alignment => "alignment",
            Self::VideoList => "video_list",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// References to the artefacts produced by one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    /// Object file reference.
    pub object: Option<String>,
    /// Alignment file reference.
    pub alignment: Option<String>,
    /// Video list reference.
    pub video_list: Option<String>,
}

impl Artifacts {
    /// Creates an empty artefact set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the object reference.
    #[must_use]
    pub fn with_object(mut self, reference: impl Into<String>) -> Self {
        self.object = Some(reference.into());
        self
    }

    /// Sets the alignment reference.
    #[must_use]
    pub fn with_alignment(mut self, reference: impl Into<String>) -> Self {
        self.alignment = Some(reference.into());
        self
    }

    /// Sets the video list reference.
    #[must_use]
    pub fn with_video_list(mut self, reference: impl Into<String>) -> Self {
        self.video_list = Some(reference.into());
        self
    }

    /// Returns the reference for `kind`, ignoring blank values.
    #[must_use]
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        let reference = match kind {
            ArtifactKind::Object => self.object.as_deref(),
            ArtifactKind::Alignment => self.alignment.as_deref(),
            ArtifactKind::VideoList => self.video_list.as_deref(),
        };
        reference.filter(|value| !value.trim().is_empty())
    }

    /// Returns whether every kind in `required` is present.
    #[must_use]
    pub fn has_all(&self, required: &[ArtifactKind]) -> bool {
        required.iter().all(|kind| self.get(*kind).is_some())
    }

    /// Returns whether any artefact is present.
    #[must_use]
    pub fn any_present(&self) -> bool {
        [
            ArtifactKind::Object,
            ArtifactKind::Alignment,
            ArtifactKind::VideoList,
        ]
        .into_iter()
        .any(|kind| self.get(kind).is_some())
    }
}

/// Work submitted when completing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Produced artefacts.
    pub artifacts: Artifacts,
    /// Time spent in seconds; derived from the start time when absent.
    pub time_taken_secs: Option<u64>,
}

impl Completion {
    /// Creates a completion carrying `artifacts`.
    #[must_use]
    pub fn new(artifacts: Artifacts) -> Self {
        Self {
            artifacts,
            time_taken_secs: None,
        }
    }

    /// Records an explicit time spent.
    #[must_use]
    pub const fn with_time_taken_secs(mut self, seconds: u64) -> Self {
        self.time_taken_secs = Some(seconds);
        self
    }
}
