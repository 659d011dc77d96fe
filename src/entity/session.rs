//! Session entity model for Sea-ORM database interaction.
//!
//! Maps to the `user_sessions` table created by the crate's migration.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing one persisted session.
///
/// # Database Schema
///
/// | Column      | Type                    | Description                             |
/// |-------------|-------------------------|-----------------------------------------|
/// | id          | TEXT (Primary Key)      | Row key, never rotated                  |
/// | session_id  | TEXT (Unique)           | Client-facing token                     |
/// | user_id     | TEXT NULL (Indexed)     | Owning principal                        |
/// | created_at  | TIMESTAMPTZ             | Creation time                           |
/// | updated_at  | TIMESTAMPTZ             | Last persisted write                    |
/// | expires_at  | TIMESTAMPTZ (Indexed)   | Absolute expiry                         |
/// | data        | BYTEA                   | Opaque serialized payload               |
/// | version     | BIGINT                  | Write counter for strict versioning     |
///
/// This entity is used internally by [`SeaOrmStore`](crate::SeaOrmStore); callers
/// work with [`SessionRecord`](crate::SessionRecord) instead.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    /// Row primary key produced by the store's identifier generator.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    /// The token handed to clients. Rotation rewrites this column in place.
    #[sea_orm(unique, column_type = "Text")]
    pub session_id: String,

    /// Owning user, `NULL` for anonymous sessions.
    #[sea_orm(column_type = "Text", nullable)]
    pub user_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Rows at or past this instant are filtered out of every read and
    /// removed by the expiry sweep.
    pub expires_at: DateTimeWithTimeZone,

    /// Serialized payload, stored verbatim.
    pub data: Vec<u8>,

    pub version: i64,
}

/// This entity has no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
