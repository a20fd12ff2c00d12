//! Typed configuration assembled from stored property overrides.

use crate::export::services::{ExportConfig, RecoveryConfig};
use crate::outcome::{Classify, ErrorKind};
use crate::settings::ports::{KeyedPropertyStore, PropertyStoreError};
use crate::task::services::ReviewPolicy;
use crate::transfer::domain::ContainerRef;
use minijinja::Environment;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Property keys read by [`SettingsLoader`].
pub mod keys {
    /// Minimum passing review score.
    pub const REVIEW_PASS_THRESHOLD: &str = "review.pass_threshold";
    /// Tasks processed between pauses.
    pub const EXPORT_CHUNK_SIZE: &str = "export.chunk_size";
    /// Pause between chunks, in milliseconds.
    pub const EXPORT_CHUNK_PAUSE_MS: &str = "export.chunk_pause_ms";
    /// Delivery budget, in seconds.
    pub const EXPORT_DELIVERY_BUDGET_SECS: &str = "export.delivery_budget_secs";
    /// JSON array of source file names excluded from staging.
    pub const EXPORT_RAW_INPUT_NAMES: &str = "export.raw_input_names";
    /// Template for batch staging container names.
    pub const EXPORT_STAGING_CONTAINER_TEMPLATE: &str = "export.staging_container_template";
    /// Destination used when a delivery names none.
    pub const EXPORT_DEFAULT_DESTINATION: &str = "export.default_destination";
    /// Age after which a running task counts as stuck, in seconds.
    pub const RECOVERY_STUCK_AFTER_SECS: &str = "recovery.stuck_after_secs";
    /// Age after which an unsettled task counts as abandoned, in days.
    pub const RECOVERY_ABANDONED_AFTER_DAYS: &str = "recovery.abandoned_after_days";
    /// Retention of progress sessions, in seconds.
    pub const RECOVERY_SESSION_TTL_SECS: &str = "recovery.session_ttl_secs";
}

/// Errors raised while loading settings.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// A stored value could not be interpreted.
    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidValue {
        /// Property key.
        key: &'static str,
        /// Stored value.
        value: String,
    },

    /// The property store failed.
    #[error(transparent)]
    Store(#[from] PropertyStoreError),
}

impl Classify for SettingsError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidValue { .. } => ErrorKind::ValidationError,
            Self::Store(err) => err.kind(),
        }
    }
}

/// Resolved configuration of every service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Review pass rule.
    pub review: ReviewPolicy,
    /// Staging and delivery tunables.
    pub export: ExportConfig,
    /// Recovery thresholds.
    pub recovery: RecoveryConfig,
    /// Destination used when a delivery names none.
    pub default_destination: Option<ContainerRef>,
}

impl Settings {
    /// Built-in defaults staging under `staging_root`.
    #[must_use]
    pub fn defaults(staging_root: ContainerRef) -> Self {
        Self {
            review: ReviewPolicy::default(),
            export: ExportConfig::new(staging_root),
            recovery: RecoveryConfig::default(),
            default_destination: None,
        }
    }
}

/// Reads overrides from a [`KeyedPropertyStore`] on top of the defaults.
#[derive(Debug, Clone)]
pub struct SettingsLoader<P>
where
    P: KeyedPropertyStore,
{
    store: Arc<P>,
}

fn invalid(key: &'static str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key,
        value: value.to_owned(),
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|_| invalid(key, raw))
}

impl<P> SettingsLoader<P>
where
    P: KeyedPropertyStore,
{
    /// Creates a loader reading from `store`.
    #[must_use]
    pub const fn new(store: Arc<P>) -> Self {
        Self { store }
    }

    /// Loads settings, applying every stored override.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidValue`] for the first malformed
    /// override, or [`SettingsError::Store`] when the store fails.
    pub async fn load(&self, staging_root: ContainerRef) -> Result<Settings, SettingsError> {
        let mut settings = Settings::defaults(staging_root);

        if let Some(raw) = self.read(keys::REVIEW_PASS_THRESHOLD).await? {
            let threshold = parse::<u16>(keys::REVIEW_PASS_THRESHOLD, &raw)?;
            settings.review = ReviewPolicy::new(threshold)
                .map_err(|_| invalid(keys::REVIEW_PASS_THRESHOLD, &raw))?;
        }

        let export = &mut settings.export;
        if let Some(raw) = self.read(keys::EXPORT_CHUNK_SIZE).await? {
            export.chunk_size = parse::<usize>(keys::EXPORT_CHUNK_SIZE, &raw)?;
            if export.chunk_size == 0 {
                return Err(invalid(keys::EXPORT_CHUNK_SIZE, &raw));
            }
        }
        if let Some(raw) = self.read(keys::EXPORT_CHUNK_PAUSE_MS).await? {
            export.chunk_pause = Duration::from_millis(parse(keys::EXPORT_CHUNK_PAUSE_MS, &raw)?);
        }
        if let Some(raw) = self.read(keys::EXPORT_DELIVERY_BUDGET_SECS).await? {
            export.delivery_budget =
                Duration::from_secs(parse(keys::EXPORT_DELIVERY_BUDGET_SECS, &raw)?);
        }
        if let Some(raw) = self.read(keys::EXPORT_RAW_INPUT_NAMES).await? {
            export.raw_input_names = serde_json::from_str(&raw)
                .map_err(|_| invalid(keys::EXPORT_RAW_INPUT_NAMES, &raw))?;
        }
        if let Some(raw) = self.read(keys::EXPORT_STAGING_CONTAINER_TEMPLATE).await? {
            Environment::new()
                .template_from_str(&raw)
                .map(|_| ())
                .map_err(|_| invalid(keys::EXPORT_STAGING_CONTAINER_TEMPLATE, &raw))?;
            export.staging_container_template = raw;
        }
        if let Some(raw) = self.read(keys::EXPORT_DEFAULT_DESTINATION).await? {
            settings.default_destination = Some(
                ContainerRef::new(raw.as_str())
                    .map_err(|_| invalid(keys::EXPORT_DEFAULT_DESTINATION, &raw))?,
            );
        }

        let recovery = &mut settings.recovery;
        if let Some(raw) = self.read(keys::RECOVERY_STUCK_AFTER_SECS).await? {
            recovery.stuck_after = Duration::from_secs(parse(keys::RECOVERY_STUCK_AFTER_SECS, &raw)?);
        }
        if let Some(raw) = self.read(keys::RECOVERY_ABANDONED_AFTER_DAYS).await? {
            recovery.abandoned_after_days = parse(keys::RECOVERY_ABANDONED_AFTER_DAYS, &raw)?;
        }
        if let Some(raw) = self.read(keys::RECOVERY_SESSION_TTL_SECS).await? {
            recovery.session_ttl = Duration::from_secs(parse(keys::RECOVERY_SESSION_TTL_SECS, &raw)?);
        }

        debug!(
            pass_threshold = %settings.review.pass_threshold,
            chunk_size = settings.export.chunk_size,
            "Settings loaded"
        );
        Ok(settings)
    }

    async fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self
            .store
            .get(key)
            .await?
            .filter(|value| !value.trim().is_empty()))
    }
}
