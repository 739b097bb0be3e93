//! Serialization protocol for snapshot state blobs

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Protocol for serializing and deserializing snapshot data
///
/// Implementations can provide custom serialization strategies
/// (JSON, bincode, etc.). The engine never interprets the encoded
/// bytes; state blobs are owned by the entity's own subsystem.
pub trait SnapshotCodec: Send + Sync {
    /// Serialize a value to bytes
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn decode<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T>;

    /// Serialize to a JSON value (for compatibility)
    fn encode_json<T: Serialize>(&self, value: &T) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(value)?)
    }

    /// Deserialize from a JSON value (for compatibility)
    fn decode_json<T: for<'de> Deserialize<'de>>(&self, value: &serde_json::Value) -> Result<T> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// JSON-based codec (default)
#[derive(Debug, Clone, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotCodec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Binary codec using bincode
#[derive(Debug, Clone, Default)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotCodec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestState {
        name: String,
        score: i32,
    }

    #[test]
    fn test_json_codec_round_trip() {
        let codec = JsonCodec::new();
        let state = TestState {
            name: "u123".to_string(),
            score: 10,
        };

        let bytes = codec.encode(&state).unwrap();
        let restored: TestState = codec.decode(&bytes).unwrap();

        assert_eq!(state, restored);
    }

    #[test]
    fn test_bincode_codec_round_trip() {
        let codec = BincodeCodec::new();
        let state = TestState {
            name: "u123".to_string(),
            score: 10,
        };

        let bytes = codec.encode(&state).unwrap();
        let restored: TestState = codec.decode(&bytes).unwrap();

        assert_eq!(state, restored);
    }

    #[test]
    fn test_json_value_round_trip() {
        let codec = JsonCodec::new();
        let state = TestState {
            name: "u123".to_string(),
            score: 10,
        };

        let json = codec.encode_json(&state).unwrap();
        let restored: TestState = codec.decode_json(&json).unwrap();

        assert_eq!(state, restored);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = JsonCodec::new();
        let err = codec.decode::<TestState>(b"not json").unwrap_err();
        assert!(matches!(err, crate::CheckpointError::Serialization(_)));
    }
}
