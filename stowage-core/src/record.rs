//! Record identity and the payload codec shared by every backend.
//!
//! Backends never store the identifier inside the payload. The id lives
//! beside the data and is attached only when a record is handed back to
//! the caller, as the `id` field of a flattened [`Record`].

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Reserved field name carrying the identifier on the read path.
pub const ID_FIELD: &str = "id";

/// Stored representation of a record: a JSON object without its id.
pub type Payload = serde_json::Map<String, Value>;

/// Opaque record identifier.
///
/// Generated ids are UUIDv7 strings, so they sort by creation time. Callers
/// may also pick their own ids through `update`, which upserts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh timestamp-sortable identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Marker trait for user data that can be stored.
///
/// The serialized form must be a JSON object. A top-level `id` field, if
/// present, is dropped on write and replaced by the record id on read.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// User data with its identifier attached.
///
/// Serializes flat: `{"id": "...", "x": "100"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(id: RecordId, data: T) -> Self {
        Self { id, data }
    }

    pub fn into_parts(self) -> (RecordId, T) {
        (self.id, self.data)
    }
}

/// Encode user data into its stored payload, stripping the id field.
pub fn to_payload<T: Serialize>(data: &T) -> StorageResult<Payload> {
    match serde_json::to_value(data)? {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        other => Err(StorageError::InvalidPayload {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

/// Decode a stored payload and attach its identifier.
pub fn from_payload<T: DeserializeOwned>(
    id: RecordId,
    payload: Payload,
) -> StorageResult<Record<T>> {
    let data = serde_json::from_value(Value::Object(payload))?;
    Ok(Record { id, data })
}

/// Split a JSON value carrying an `id` field into the id and its payload.
///
/// Returns `None` for the id when the field is missing or not a string.
pub fn split_id(value: Value) -> StorageResult<(Option<RecordId>, Payload)> {
    match value {
        Value::Object(mut map) => {
            let id = match map.remove(ID_FIELD) {
                Some(Value::String(id)) => Some(RecordId::new(id)),
                _ => None,
            };
            Ok((id, map))
        }
        other => Err(StorageError::InvalidPayload {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: String,
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_to_payload_strips_id() {
        let payload = to_payload(&json!({"id": "abc", "x": "100"})).unwrap();
        assert_eq!(payload.get("x"), Some(&json!("100")));
        assert!(payload.get(ID_FIELD).is_none());
    }

    #[test]
    fn test_to_payload_rejects_non_objects() {
        let err = to_payload(&json!(["a", "b"])).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPayload { .. }));
        assert!(err.to_string().contains("an array"));

        let err = to_payload(&42).unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn test_from_payload_attaches_id() {
        let payload = to_payload(&Point { x: "100".into() }).unwrap();
        let record: Record<Point> = from_payload(RecordId::from("k"), payload).unwrap();
        assert_eq!(record.id.as_str(), "k");
        assert_eq!(record.data, Point { x: "100".into() });
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = Record::new(RecordId::from("k"), Point { x: "100".into() });
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"id": "k", "x": "100"}));

        let back: Record<Point> = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_split_id() {
        let (id, payload) = split_id(json!({"id": "k", "x": "200"})).unwrap();
        assert_eq!(id, Some(RecordId::from("k")));
        assert_eq!(payload.len(), 1);

        let (id, _) = split_id(json!({"id": 7, "x": "200"})).unwrap();
        assert!(id.is_none());

        assert!(split_id(json!("k")).is_err());
    }
}
