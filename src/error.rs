//! Error types shared by the record stores and the lifecycle manager.

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by session stores and the [`SessionManager`](crate::SessionManager).
///
/// A missing or expired session is not an error: stores report it as `Ok(None)`
/// from [`SessionStore::load`](crate::SessionStore::load) and the manager turns it
/// into a fresh, unbound handle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write was rejected by the backing store.
    ///
    /// Covers constraint violations (including a repeated identifier collision),
    /// connection failures on the write path, and saves against a row that was
    /// deleted concurrently.
    #[error("session store write failed: {0}")]
    StoreWrite(String),

    /// A save tried to move a row onto a client token that another row holds.
    ///
    /// Raised when a rotated token collides; callers may retry with a freshly
    /// generated token.
    #[error("session token already in use by another row (saving {0})")]
    TokenInUse(String),

    /// Strict versioning detected a concurrent modification of the row.
    #[error("stale write for session row {id}: expected version {expected}")]
    StaleWrite {
        /// Primary key of the row that was modified underneath the caller.
        id: String,
        /// The version the caller based its write on.
        expected: i64,
    },

    /// The record's expiry is not in the future, so it cannot be written.
    #[error("refusing to persist expired session row {0}")]
    Expired(String),

    /// A read against the backing store failed.
    #[error("session store backend error: {0}")]
    Backend(String),

    /// The session payload could not be serialized.
    #[error("failed to encode session payload: {0}")]
    Encode(String),

    /// The session payload or a stored value could not be deserialized.
    #[error("failed to decode session payload: {0}")]
    Decode(String),

    /// The manager was assembled with missing or invalid settings.
    #[error("invalid session configuration: {0}")]
    Config(String),
}
