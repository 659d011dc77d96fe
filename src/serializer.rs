//! Encoding of the logical key/value payload into the opaque blob a store persists.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::{Error, Result};

/// The logical contents of a session.
pub type Payload = HashMap<String, serde_json::Value>;

/// Converts a [`Payload`] to and from the bytes stored in
/// [`SessionRecord::data`](crate::SessionRecord::data).
pub trait SessionSerializer: Debug + Send + Sync {
    /// Serializes a payload for storage.
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>>;

    /// Restores a payload from stored bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Payload>;
}

/// Compact MessagePack encoding. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackSerializer;

impl SessionSerializer for MessagePackSerializer {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(payload).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Plain JSON encoding, handy when the stored rows need to be human readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SessionSerializer for JsonSerializer {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        serde_json::to_vec(payload).map_err(|e| Error::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Payload> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Payload {
        Payload::from([
            ("cart".to_string(), json!({ "items": [1, 2, 3], "total": 42.5 })),
            ("theme".to_string(), json!("dark")),
        ])
    }

    #[test]
    fn message_pack_preserves_nested_values() {
        let bytes = MessagePackSerializer.encode(&sample()).unwrap();
        assert_eq!(MessagePackSerializer.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn json_output_is_readable() {
        let bytes = JsonSerializer.encode(&sample()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.contains("\"theme\":\"dark\""));
        assert_eq!(JsonSerializer.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = JsonSerializer.decode(b"not json").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
