use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::id::{IdGenerator, UuidGenerator};
use crate::record::{expiry_after, SessionRecord};
use crate::store::SessionStore;

/// An in-process [`SessionStore`] keeping rows in a mutex-guarded map.
///
/// Useful for tests and single-process deployments. Clones share the same rows.
/// Lookups by `session_id` and `user_id` scan the map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<String, SessionRecord>>>,
    id_generator: Arc<dyn IdGenerator>,
    session_id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    strict_versioning: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Arc::default(),
            id_generator: Arc::new(UuidGenerator),
            session_id_generator: Arc::new(UuidGenerator),
            clock: Arc::new(SystemClock),
            strict_versioning: false,
        }
    }

    /// Uses `generator` for both row keys and client tokens.
    pub fn with_id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        let generator: Arc<dyn IdGenerator> = Arc::new(generator);
        self.session_id_generator = generator.clone();
        self.id_generator = generator;
        self
    }

    /// Mints client tokens with `generator`, leaving row keys alone.
    pub fn with_session_id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.session_id_generator = Arc::new(generator);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Reject saves whose `version` does not match the stored row.
    pub fn with_strict_versioning(mut self, strict: bool) -> Self {
        self.strict_versioning = strict;
        self
    }

    /// Number of physical rows, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<String, SessionRecord>>> {
        self.rows
            .lock()
            .map_err(|_| Error::Backend("memory store lock poisoned".into()))
    }
}

fn token_taken(
    rows: &HashMap<String, SessionRecord>,
    session_id: &str,
    except_id: Option<&str>,
) -> bool {
    rows.values()
        .any(|row| row.session_id == session_id && Some(row.id.as_str()) != except_id)
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(
        &self,
        user_id: Option<&str>,
        data: Vec<u8>,
        ttl: Duration,
    ) -> Result<SessionRecord> {
        let now = self.clock.now();
        let expires_at = expiry_after(now, ttl)?;
        let mut rows = self.rows()?;

        let mut retried = false;
        let (id, session_id) = loop {
            let id = self.id_generator.generate();
            let session_id = self.session_id_generator.generate();
            if !rows.contains_key(&id) && !token_taken(&rows, &session_id, None) {
                break (id, session_id);
            }
            if retried {
                return Err(Error::StoreWrite("session identifier collision".into()));
            }
            tracing::debug!("session identifier collision, regenerating");
            retried = true;
        };

        let record = SessionRecord {
            id,
            session_id,
            user_id: user_id.map(str::to_owned),
            created_at: now,
            updated_at: now,
            expires_at,
            data,
            version: 0,
        };
        if record.is_expired_at(now) {
            return Err(Error::Expired(record.id));
        }

        rows.insert(record.id.clone(), record.clone());
        tracing::debug!(id = %record.id, "created session row");
        Ok(record)
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let now = self.clock.now();
        let rows = self.rows()?;
        Ok(rows
            .values()
            .find(|row| row.session_id == session_id && !row.is_expired_at(now))
            .cloned())
    }

    async fn save(&self, record: &mut SessionRecord) -> Result<()> {
        let now = self.clock.now();
        if record.is_expired_at(now) {
            return Err(Error::Expired(record.id.clone()));
        }

        let mut rows = self.rows()?;
        if !rows.contains_key(&record.id) {
            return Err(Error::StoreWrite(format!(
                "session row {} no longer exists",
                record.id
            )));
        }
        if token_taken(&rows, &record.session_id, Some(&record.id)) {
            return Err(Error::TokenInUse(record.id.clone()));
        }
        let Some(stored) = rows.get_mut(&record.id) else {
            return Err(Error::StoreWrite(format!(
                "session row {} no longer exists",
                record.id
            )));
        };
        if self.strict_versioning && stored.version != record.version {
            return Err(Error::StaleWrite {
                id: record.id.clone(),
                expected: record.version,
            });
        }

        record.updated_at = now;
        record.version = stored.version + 1;
        *stored = SessionRecord {
            created_at: stored.created_at,
            ..record.clone()
        };
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.rows()?.retain(|_, row| row.session_id != session_id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let now = self.clock.now();
        let mut sessions: Vec<SessionRecord> = self
            .rows()?
            .values()
            .filter(|row| row.user_id.as_deref() == Some(user_id) && !row.is_expired_at(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|_, row| row.user_id.as_deref() != Some(user_id));
        let removed = (before - rows.len()) as u64;
        tracing::debug!(removed, "deleted sessions for user");
        Ok(removed)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let mut rows = self.rows()?;
        let before = rows.len();
        rows.retain(|_, row| !row.is_expired_at(now));
        let removed = (before - rows.len()) as u64;
        tracing::debug!(removed, "swept expired session rows");
        Ok(removed)
    }

    fn generate_session_id(&self) -> String {
        self.session_id_generator.generate()
    }
}
