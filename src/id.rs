//! Identifier generation strategies for row keys and session tokens.

use std::fmt::Debug;

use uuid::Uuid;

/// Mints fresh, unguessable string identifiers.
///
/// Stores use one generator for row primary keys and, unless a separate one
/// is configured, for client-facing tokens as well.
/// Implementations must be collision resistant under concurrent use; a
/// collision is treated as a retryable write failure, not a fatal one.
pub trait IdGenerator: Debug + Send + Sync {
    /// Returns a new identifier.
    fn generate(&self) -> String;
}

/// Default generator backed by random (v4) UUIDs, rendered without hyphens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
