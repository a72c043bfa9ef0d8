//! Pure functions for serializing/deserializing entity snapshots to/from cache values.
//!
//! Snapshots are JSON arrays, so cache values stay human-readable and easy to
//! inspect from a Redis shell.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::CacheError;

/// Errors that can occur during snapshot serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize rows to a string.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize a string to rows.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

impl From<SerializationError> for CacheError {
    fn from(err: SerializationError) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes the full row set of an entity type to a JSON array.
pub fn serialize_snapshot<E: Serialize>(rows: &[E]) -> Result<String> {
    serde_json::to_string(rows).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes a JSON array back into rows.
pub fn deserialize_snapshot<E: DeserializeOwned>(value: &str) -> Result<Vec<E>> {
    serde_json::from_str(value).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Widget;
    use uuid::Uuid;

    fn widget(name: &str) -> Widget {
        let mut widget = Widget::new(name, 9.5);
        widget.tags = vec!["desk".to_string()];
        widget.tenant_id = Some(Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap());
        widget
    }

    #[test]
    fn test_roundtrip_snapshot() {
        let rows = vec![widget("Lamp"), widget("Chair")];

        let value = serialize_snapshot(&rows).expect("serialize should succeed");
        let restored: Vec<Widget> = deserialize_snapshot(&value).expect("deserialize should succeed");

        assert_eq!(rows, restored);
    }

    #[test]
    fn test_serialize_empty_snapshot() {
        let rows: Vec<Widget> = vec![];

        let value = serialize_snapshot(&rows).expect("serialize should succeed");
        let restored: Vec<Widget> = deserialize_snapshot(&value).expect("deserialize should succeed");

        assert_eq!(value, "[]");
        assert!(restored.is_empty());
    }

    #[test]
    fn test_snapshot_uses_entity_field_names() {
        let value = serialize_snapshot(&[widget("Lamp")]).unwrap();

        assert!(value.contains("\"isActive\":true"));
        assert!(value.contains("\"tenantId\""));
    }

    #[test]
    fn test_deserialize_malformed_value() {
        let result = deserialize_snapshot::<Widget>("not valid json");

        assert!(matches!(result, Err(SerializationError::DeserializeFailed(_))));
    }

    #[test]
    fn test_deserialize_object_instead_of_array() {
        let result = deserialize_snapshot::<Widget>("{\"invalid\": true}");

        assert!(matches!(result, Err(SerializationError::DeserializeFailed(_))));
    }

    #[test]
    fn test_serialization_error_converts_to_cache_error() {
        let error: CacheError = SerializationError::DeserializeFailed("eof".to_string()).into();

        assert_eq!(
            error,
            CacheError::Serialization("Failed to deserialize: eof".to_string())
        );
    }
}
