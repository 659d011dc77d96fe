//! Database entity models for the SeaORM-backed session store.
//!
//! The only entity is [`session`], one row per live (or not yet swept) session.

/// Sea-ORM entity for the `user_sessions` table.
pub mod session;
