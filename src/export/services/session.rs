//! Session/progress tracker backed by the keyed property store.

use crate::export::domain::{ExportSession, NewSession, SESSION_KEY_PREFIX, SessionId};
use crate::export::error::{SessionError, SessionResult};
use crate::settings::ports::KeyedPropertyStore;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default retention of progress sessions.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Persists progress snapshots as JSON under `export_<id>`.
///
/// Snapshots expire `ttl` after their last update: [`SessionTracker::get`]
/// no longer returns them and [`SessionTracker::purge_expired`] deletes
/// them.
pub struct SessionTracker<P, C>
where
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    store: Arc<P>,
    clock: Arc<C>,
    ttl: TimeDelta,
}

impl<P, C> Clone for SessionTracker<P, C>
where
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            ttl: self.ttl,
        }
    }
}

impl<P, C> SessionTracker<P, C>
where
    P: KeyedPropertyStore,
    C: Clock + Send + Sync,
{
    /// Creates a tracker with the default retention.
    #[must_use]
    pub fn new(store: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            ttl: TimeDelta::from_std(DEFAULT_SESSION_TTL).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Replaces the retention period.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        self
    }

    /// Opens and persists a running session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the snapshot cannot be stored.
    pub async fn create(&self, params: NewSession) -> SessionResult<ExportSession> {
        let session = ExportSession::start(params, self.clock.utc());
        self.save(&session).await?;
        debug!(session_id = %session.id, total = session.total, "Export session opened");
        Ok(session)
    }

    /// Stamps and persists the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the snapshot cannot be stored.
    pub async fn update(&self, session: &mut ExportSession) -> SessionResult<()> {
        session.updated_at = self.clock.utc();
        self.save(session).await
    }

    /// Returns the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] when the session is missing or
    /// expired.
    pub async fn get(&self, id: SessionId) -> SessionResult<ExportSession> {
        let key = id.storage_key();
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or(SessionError::NotFound(id))?;
        let session: ExportSession =
            serde_json::from_str(&raw).map_err(|err| SessionError::serialization(&key, err))?;
        if self.is_expired(&session, self.clock.utc()) {
            return Err(SessionError::NotFound(id));
        }
        Ok(session)
    }

    /// Returns the latest snapshot for a caller-supplied id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidId`] when `raw_id` is not a session id,
    /// otherwise as [`SessionTracker::get`].
    pub async fn get_by_str(&self, raw_id: &str) -> SessionResult<ExportSession> {
        let id =
            SessionId::parse(raw_id).map_err(|_| SessionError::InvalidId(raw_id.to_owned()))?;
        self.get(id).await
    }

    /// Deletes expired and unreadable snapshots, returning how many went.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] when the property store fails.
    pub async fn purge_expired(&self) -> SessionResult<usize> {
        let now = self.clock.utc();
        let mut purged = 0;
        for key in self.store.keys_with_prefix(SESSION_KEY_PREFIX).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let expired = match serde_json::from_str::<ExportSession>(&raw) {
                Ok(session) => self.is_expired(&session, now),
                Err(err) => {
                    warn!(key = %key, error = %err, "Discarding unreadable export session");
                    true
                }
            };
            if expired && self.store.delete(&key).await? {
                purged += 1;
            }
        }
        if purged > 0 {
            debug!(purged, "Expired export sessions purged");
        }
        Ok(purged)
    }

    fn is_expired(&self, session: &ExportSession, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.updated_at) > self.ttl
    }

    async fn save(&self, session: &ExportSession) -> SessionResult<()> {
        let key = session.id.storage_key();
        let payload =
            serde_json::to_string(session).map_err(|err| SessionError::serialization(&key, err))?;
        self.store.set(&key, &payload).await?;
        Ok(())
    }
}
