use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{Error, Result};

/// The durable unit persisted by a [`SessionStore`](crate::SessionStore).
///
/// `id` is the storage primary key and never changes for the lifetime of the
/// row. `session_id` is the token handed to the client; it can be rotated in
/// place, which invalidates the previous token without creating a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Storage primary key.
    pub id: String,
    /// Client-facing token, unique across live rows.
    pub session_id: String,
    /// Owning principal, if any. Anonymous sessions have none.
    pub user_id: Option<String>,
    /// Set once when the row is created.
    pub created_at: OffsetDateTime,
    /// Refreshed by the store on every persisted write.
    pub updated_at: OffsetDateTime,
    /// Absolute expiry. Rows at or past this instant are invisible to loads.
    pub expires_at: OffsetDateTime,
    /// Opaque serialized payload.
    pub data: Vec<u8>,
    /// Write counter, checked by stores running in strict versioning mode.
    pub version: i64,
}

impl SessionRecord {
    /// Whether the record is logically deleted at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// `now + ttl`, or [`Error::Encode`] when the instant is not representable.
pub(crate) fn expiry_after(now: OffsetDateTime, ttl: Duration) -> Result<OffsetDateTime> {
    now.checked_add(ttl)
        .ok_or_else(|| Error::Encode(format!("session lifetime {ttl} overflows the expiry timestamp")))
}
