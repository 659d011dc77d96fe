use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::record::SessionRecord;
use crate::serializer::Payload;

/// Where a [`SessionHandle`] stands relative to the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No row exists yet. Stays this way unless the payload becomes non-empty.
    Unbound,
    /// Backed by a stored row.
    Bound,
    /// Flagged for deletion. Terminal: closing the handle removes the row and
    /// a later `open` starts afresh.
    Deleted,
}

/// Per-request view of one session.
///
/// Obtained from [`SessionManager::open`](crate::SessionManager::open) and
/// handed back to [`SessionManager::close`](crate::SessionManager::close),
/// which is the single commit point. Dropping a handle without closing it
/// leaves the store untouched.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub(crate) record: Option<SessionRecord>,
    pub(crate) payload: Payload,
    pub(crate) user_id: Option<String>,
    pub(crate) dirty: bool,
    pub(crate) delete_requested: bool,
    pub(crate) rotate_requested: bool,
}

impl SessionHandle {
    pub(crate) fn unbound() -> Self {
        Self {
            record: None,
            payload: Payload::new(),
            user_id: None,
            dirty: false,
            delete_requested: false,
            rotate_requested: false,
        }
    }

    pub(crate) fn bound(record: SessionRecord, payload: Payload) -> Self {
        Self {
            user_id: record.user_id.clone(),
            record: Some(record),
            payload,
            dirty: false,
            delete_requested: false,
            rotate_requested: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.record, self.delete_requested) {
            (_, true) => SessionState::Deleted,
            (Some(_), false) => SessionState::Bound,
            (None, false) => SessionState::Unbound,
        }
    }

    /// The client token of the backing row, if there is one.
    pub fn session_id(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.session_id.as_str())
    }

    /// The backing row as it was loaded.
    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.record.as_ref().map(|r| r.expires_at)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Associates the session with a user.
    ///
    /// On a bound session the change is written at close, in place unless the
    /// manager is configured to rotate the token on user changes.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    pub fn clear_user_id(&mut self) {
        self.user_id = None;
    }

    /// Reads and deserializes the value under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.payload
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(|e| Error::Decode(e.to_string()))
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Serializes `value` under `key`, returning the previous raw value.
    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<Option<Value>> {
        let value = serde_json::to_value(value).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(self.insert_value(key, value))
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.dirty = true;
        self.payload.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.payload.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drops every key. Closing a bound anonymous session with an emptied
    /// payload deletes its row.
    pub fn clear(&mut self) {
        if !self.payload.is_empty() {
            self.payload.clear();
            self.dirty = true;
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.payload.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.payload.keys().map(String::as_str)
    }

    /// Requests removal of the backing row at close (logout).
    pub fn mark_for_deletion(&mut self) {
        self.delete_requested = true;
    }

    pub fn is_marked_for_deletion(&self) -> bool {
        self.delete_requested
    }

    /// Requests a fresh client token at close, keeping the row and its data.
    /// Call this on privilege changes such as login.
    pub fn cycle_id(&mut self) {
        self.rotate_requested = true;
    }

    /// Whether the payload changed since the handle was opened.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
