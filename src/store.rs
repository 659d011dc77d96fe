use std::fmt::Debug;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::error::Result;
use crate::record::SessionRecord;

/// Durable storage for [`SessionRecord`]s.
///
/// The [`SessionManager`](crate::SessionManager) depends only on this trait.
/// Implementations must be safe under concurrent callers sharing one backing
/// store, and must treat a row whose `expires_at` has passed as absent on
/// every read path.
#[async_trait]
pub trait SessionStore: Debug + Send + Sync + 'static {
    /// Inserts a new row with freshly generated `id` and `session_id`.
    ///
    /// `created_at` and `updated_at` are set to now and `expires_at` to
    /// `now + ttl`. An identifier collision is retried once with new
    /// identifiers; a second collision fails with
    /// [`Error::StoreWrite`](crate::Error::StoreWrite).
    async fn create(
        &self,
        user_id: Option<&str>,
        data: Vec<u8>,
        ttl: Duration,
    ) -> Result<SessionRecord>;

    /// Fetches the live row carrying `session_id`.
    ///
    /// Returns `Ok(None)` when no row matches or the match has expired.
    async fn load(&self, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Writes `record` over the row with the same `id`.
    ///
    /// `session_id`, `user_id`, `expires_at` and `data` are taken from the
    /// record; `updated_at` and `version` are assigned by the store and written
    /// back into `record`. Fails with
    /// [`Error::StoreWrite`](crate::Error::StoreWrite) if the row is gone and
    /// with [`Error::TokenInUse`](crate::Error::TokenInUse) if another row
    /// already holds `session_id`.
    async fn save(&self, record: &mut SessionRecord) -> Result<()>;

    /// Removes the row carrying `session_id`. Deleting an absent session is not an error.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// All live rows owned by `user_id`, most recently created first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SessionRecord>>;

    /// Removes every row owned by `user_id`, expired or not, returning how many went.
    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64>;

    /// Removes every row with `expires_at <= now`, returning how many went.
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64>;

    /// Mints a new client token using the store's token generator.
    fn generate_session_id(&self) -> String;
}
