//! Tunables for the export pipeline and the recovery module.

use crate::export::error::{ExportError, ExportResult};
use crate::task::domain::{ArtifactKind, ExportBatchId};
use crate::transfer::domain::ContainerRef;
use chrono::{DateTime, TimeDelta, Utc};
use minijinja::Environment;
use serde_json::{Map, Value};
use std::time::Duration;

/// Tasks processed between pauses.
pub const DEFAULT_CHUNK_SIZE: usize = 10;
/// Pause between chunks.
pub const DEFAULT_CHUNK_PAUSE: Duration = Duration::from_secs(1);
/// Wall-clock budget of one delivery run.
pub const DEFAULT_DELIVERY_BUDGET: Duration = Duration::from_secs(5 * 60);
/// Source files that are never staged.
pub const DEFAULT_RAW_INPUT_NAMES: [&str; 3] =
    ["raw_video.mp4", "raw_audio.wav", "raw_metadata.json"];
/// Name of the batch staging container.
pub const DEFAULT_STAGING_CONTAINER_TEMPLATE: &str = "{{ batch_id }}";
/// Artefacts a task needs before it can be staged.
pub const DEFAULT_REQUIRED_ARTIFACTS: [ArtifactKind; 2] =
    [ArtifactKind::Object, ArtifactKind::Alignment];

/// Staging and delivery configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Container under which batch staging containers are created.
    pub staging_root: ContainerRef,
    /// Tasks processed between pauses; zero is treated as one.
    pub chunk_size: usize,
    /// Pause between chunks, easing load on the transfer backend.
    pub chunk_pause: Duration,
    /// Wall-clock budget of one delivery run.
    pub delivery_budget: Duration,
    /// Source file names excluded from staging.
    pub raw_input_names: Vec<String>,
    /// `minijinja` template for batch container names; `batch_id` and
    /// `date` are in scope.
    pub staging_container_template: String,
    /// Artefacts required for selection.
    pub required_artifacts: Vec<ArtifactKind>,
}

impl ExportConfig {
    /// Creates the default configuration staging under `staging_root`.
    #[must_use]
    pub fn new(staging_root: ContainerRef) -> Self {
        Self {
            staging_root,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pause: DEFAULT_CHUNK_PAUSE,
            delivery_budget: DEFAULT_DELIVERY_BUDGET,
            raw_input_names: DEFAULT_RAW_INPUT_NAMES
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            staging_container_template: DEFAULT_STAGING_CONTAINER_TEMPLATE.to_owned(),
            required_artifacts: DEFAULT_REQUIRED_ARTIFACTS.to_vec(),
        }
    }

    /// Default configuration without the inter-chunk pause.
    #[must_use]
    pub fn for_tests(staging_root: ContainerRef) -> Self {
        Self {
            chunk_pause: Duration::ZERO,
            ..Self::new(staging_root)
        }
    }

    /// Returns the effective chunk size.
    #[must_use]
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Returns the delivery budget as a `chrono` delta.
    #[must_use]
    pub fn delivery_budget_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.delivery_budget).unwrap_or(TimeDelta::MAX)
    }

    /// Returns whether `name` is a raw input file.
    #[must_use]
    pub fn is_raw_input(&self, name: &str) -> bool {
        self.raw_input_names
            .iter()
            .any(|raw| raw.eq_ignore_ascii_case(name))
    }

    /// Renders the batch staging container name.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Template`] when the template fails to render
    /// or renders to a blank name.
    pub fn staging_container_name(
        &self,
        batch_id: &ExportBatchId,
        date: DateTime<Utc>,
    ) -> ExportResult<String> {
        let mut context = Map::new();
        context.insert("batch_id".to_owned(), Value::from(batch_id.as_str()));
        context.insert(
            "date".to_owned(),
            Value::from(date.format("%Y-%m-%d").to_string()),
        );
        let rendered = Environment::new()
            .render_str(&self.staging_container_template, context)
            .map_err(|error| ExportError::Template(error.to_string()))?;
        let name = rendered.trim();
        if name.is_empty() {
            return Err(ExportError::Template(format!(
                "template '{}' rendered an empty name",
                self.staging_container_template
            )));
        }
        Ok(name.to_owned())
    }
}

/// Stuck/abandoned thresholds and session retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Age after which a `STAGING`/`DELIVERING` task counts as stuck.
    pub stuck_after: Duration,
    /// Age in days after which an unsettled task counts as abandoned.
    pub abandoned_after_days: u32,
    /// Retention of progress sessions.
    pub session_ttl: Duration,
}

impl RecoveryConfig {
    /// Returns the stuck threshold as a `chrono` delta.
    #[must_use]
    pub fn stuck_after_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.stuck_after).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stuck_after: Duration::from_secs(30 * 60),
            abandoned_after_days: 7,
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}
