//! `Serializer`: pluggable channel-value encoding, grounded on this
//! codebase's `Serializer<S>` trait and `JsonSerializer` in its memory
//! module. That trait is generic over the checkpointed state type; here the
//! state is always a `serde_json::Value` (see `crate::value`), so the engine
//! pins the generic parameter rather than reintroducing it.

use serde_json::Value;

use crate::error::EngineError;

/// Encodes and decodes a single channel's checkpoint `Value` for storage.
/// `CheckpointData::channel_states` holds one serialized entry per
/// non-empty channel (SPEC_FULL.md §6).
pub trait Serializer: Send + Sync {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, EngineError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Value, EngineError>;

    fn serialize_to_string(&self, value: &Value) -> Result<String, EngineError>;
    fn deserialize_from_string(&self, text: &str) -> Result<Value, EngineError>;
}

/// Default `Serializer`, backed by `serde_json`. Self-describing text, so
/// `deserialize*` accepts whatever `serialize*` produced without a
/// side-channel schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(value)
            .map_err(|e| EngineError::checkpoint(format!("serialization failed: {e}")))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, EngineError> {
        serde_json::from_slice(bytes)
            .map_err(|e| EngineError::checkpoint(format!("deserialization failed: {e}")))
    }

    fn serialize_to_string(&self, value: &Value) -> Result<String, EngineError> {
        serde_json::to_string(value)
            .map_err(|e| EngineError::checkpoint(format!("serialization failed: {e}")))
    }

    fn deserialize_from_string(&self, text: &str) -> Result<Value, EngineError> {
        serde_json::from_str(text)
            .map_err(|e| EngineError::checkpoint(format!("deserialization failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: bytes round-trip preserves a channel value exactly.
    #[test]
    fn bytes_round_trip_preserves_value() {
        let serializer = JsonSerializer;
        let value = json!({"x": 1, "y": ["a", "b"]});
        let bytes = serializer.serialize(&value).unwrap();
        let restored = serializer.deserialize(&bytes).unwrap();
        assert_eq!(restored, value);
    }

    /// **Scenario**: string round-trip matches bytes round-trip.
    #[test]
    fn string_round_trip_preserves_value() {
        let serializer = JsonSerializer;
        let value = json!("hello");
        let text = serializer.serialize_to_string(&value).unwrap();
        let restored = serializer.deserialize_from_string(&text).unwrap();
        assert_eq!(restored, value);
    }

    /// **Scenario**: malformed input surfaces as a Checkpoint error.
    #[test]
    fn malformed_bytes_is_checkpoint_error() {
        let serializer = JsonSerializer;
        let err = serializer.deserialize(b"not json").unwrap_err();
        assert!(matches!(err, EngineError::Checkpoint { .. }));
    }
}
