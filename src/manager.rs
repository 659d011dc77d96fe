use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::handle::SessionHandle;
use crate::record::{expiry_after, SessionRecord};
use crate::serializer::{MessagePackSerializer, Payload, SessionSerializer};
use crate::store::SessionStore;

/// Request-facing session lifecycle on top of a [`SessionStore`].
///
/// The manager holds no per-request state and is cheap to clone; each request
/// works on its own [`SessionHandle`]. It never touches cookies or headers:
/// [`open`](Self::open) takes the token the transport layer extracted, and
/// [`close`](Self::close) returns the token to send back, or `None` when the
/// client should forget it.
///
/// ```no_run
/// use server_sessions_seaorm::{MemoryStore, SessionManager};
///
/// # async fn handle_request(cookie: Option<&str>) -> server_sessions_seaorm::Result<Option<String>> {
/// let sessions = SessionManager::new(MemoryStore::new());
///
/// let mut session = sessions.open(cookie).await?;
/// let visits: u32 = session.get("visits")?.unwrap_or(0);
/// session.insert("visits", visits + 1)?;
///
/// sessions.close(session).await
/// # }
/// ```
///
/// Concurrent requests carrying the same token each load, mutate and save
/// independently; the last save wins unless the store runs in strict
/// versioning mode.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    serializer: Arc<dyn SessionSerializer>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionManager {
    /// A manager with default configuration, MessagePack payloads and the system clock.
    pub fn new(store: impl SessionStore) -> Self {
        Self {
            store: Arc::new(store),
            serializer: Arc::new(MessagePackSerializer),
            clock: Arc::new(SystemClock),
            config: SessionConfig::default(),
        }
    }

    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Loads the session behind `incoming_session_id`.
    ///
    /// A missing, unknown or expired token yields an empty unbound handle, as
    /// does a row whose payload no longer decodes.
    pub async fn open(&self, incoming_session_id: Option<&str>) -> Result<SessionHandle> {
        let Some(session_id) = incoming_session_id.filter(|id| !id.is_empty()) else {
            return Ok(SessionHandle::unbound());
        };

        let Some(record) = self.store.load(session_id).await? else {
            tracing::debug!("no live session for presented token, starting anonymous session");
            return Ok(SessionHandle::unbound());
        };

        match self.serializer.decode(&record.data) {
            Ok(payload) => Ok(SessionHandle::bound(record, payload)),
            Err(err) => {
                tracing::warn!(id = %record.id, error = %err, "discarding undecodable session payload");
                Ok(SessionHandle::unbound())
            }
        }
    }

    /// Creates a row right away, regardless of payload, and returns its handle.
    pub async fn start(&self, user_id: Option<&str>) -> Result<SessionHandle> {
        let payload = Payload::new();
        let data = self.serializer.encode(&payload)?;
        let record = self.store.create(user_id, data, self.config.ttl()).await?;
        Ok(SessionHandle::bound(record, payload))
    }

    /// Commits the handle and returns the token the client should hold.
    ///
    /// - Marked for deletion: the row (if any) is deleted; returns `None`.
    /// - Unbound with an empty payload: nothing is written; returns `None`.
    /// - Unbound with a payload: a row is created; returns its token.
    /// - Bound, anonymous and emptied by this request: the row is deleted; returns `None`.
    /// - Bound and changed, rotated, re-owned or near expiry: saved with a
    ///   refreshed expiry; returns the (possibly rotated) token.
    /// - Bound and untouched: nothing is written; returns the existing token.
    pub async fn close(&self, handle: SessionHandle) -> Result<Option<String>> {
        let SessionHandle {
            record,
            payload,
            user_id,
            dirty,
            delete_requested,
            rotate_requested,
        } = handle;

        if delete_requested {
            if let Some(record) = record {
                self.store.delete(&record.session_id).await?;
                tracing::debug!(id = %record.id, "deleted session on request");
            }
            return Ok(None);
        }

        let Some(mut record) = record else {
            if payload.is_empty() {
                return Ok(None);
            }
            let data = self.serializer.encode(&payload)?;
            let record = self
                .store
                .create(user_id.as_deref(), data, self.config.ttl())
                .await?;
            return Ok(Some(record.session_id));
        };

        if dirty && payload.is_empty() && user_id.is_none() {
            self.store.delete(&record.session_id).await?;
            tracing::debug!(id = %record.id, "deleted emptied anonymous session");
            return Ok(None);
        }

        let now = self.clock.now();
        let user_changed = record.user_id != user_id;
        let rotate = rotate_requested || (user_changed && self.config.rotate_on_user_change);
        let near_expiry = record.expires_at - now <= self.config.refresh_window();

        if !(dirty || user_changed || rotate || near_expiry) {
            return Ok(Some(record.session_id));
        }

        if dirty {
            record.data = self.serializer.encode(&payload)?;
        }
        record.user_id = user_id;
        record.expires_at = expiry_after(now, self.config.ttl())?;
        if record.is_expired_at(now) {
            return Err(Error::Expired(record.id));
        }

        if rotate {
            self.save_rotated(&mut record).await?;
            tracing::debug!(id = %record.id, "rotated session token");
        } else {
            self.store.save(&mut record).await?;
        }
        Ok(Some(record.session_id))
    }

    /// Live sessions owned by `user_id`, newest first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        self.store.list_for_user(user_id).await
    }

    pub async fn revoke_session(&self, session_id: &str) -> Result<()> {
        self.store.delete(session_id).await
    }

    /// Deletes every session of `user_id`, returning how many rows went.
    pub async fn revoke_all_sessions(&self, user_id: &str) -> Result<u64> {
        let removed = self.store.delete_all_for_user(user_id).await?;
        tracing::debug!(removed, "revoked all sessions for user");
        Ok(removed)
    }

    /// Removes rows that expired as of the manager's clock. Meant to be driven
    /// by an external scheduler.
    pub async fn delete_expired(&self) -> Result<u64> {
        self.store.delete_expired(self.clock.now()).await
    }

    async fn save_rotated(&self, record: &mut SessionRecord) -> Result<()> {
        record.session_id = self.store.generate_session_id();
        match self.store.save(record).await {
            Err(Error::TokenInUse(_)) => {
                tracing::debug!(id = %record.id, "rotated token already taken, retrying once");
                record.session_id = self.store.generate_session_id();
                self.store.save(record).await
            }
            other => other,
        }
    }
}

/// Assembles a [`SessionManager`], validating its dependencies and settings.
///
/// ```
/// use server_sessions_seaorm::{JsonSerializer, MemoryStore, SessionConfig, SessionManager};
/// use time::Duration;
///
/// let manager = SessionManager::builder()
///     .store(MemoryStore::new())
///     .serializer(JsonSerializer)
///     .config(SessionConfig::default().with_ttl(Duration::hours(8)))
///     .build()
///     .expect("valid session settings");
/// assert_eq!(manager.config().ttl(), Duration::hours(8));
/// assert_eq!(manager.config().refresh_window(), Duration::hours(4));
/// ```
#[derive(Debug, Default)]
pub struct SessionManagerBuilder {
    store: Option<Arc<dyn SessionStore>>,
    serializer: Option<Arc<dyn SessionSerializer>>,
    clock: Option<Arc<dyn Clock>>,
    config: SessionConfig,
}

impl SessionManagerBuilder {
    pub fn store(mut self, store: impl SessionStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Uses a store that is already shared elsewhere.
    pub fn shared_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn serializer(mut self, serializer: impl SessionSerializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails with [`Error::Config`] when no store was given or the
    /// configuration does not validate.
    pub fn build(self) -> Result<SessionManager> {
        let store = self
            .store
            .ok_or_else(|| Error::Config("a session store is required".into()))?;
        self.config.validate()?;

        Ok(SessionManager {
            store,
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(MessagePackSerializer)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        })
    }
}
