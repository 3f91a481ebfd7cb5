//! Snapshot encoding helpers shared by the tracker stores.
//!
//! Stored snapshots are untrusted: the top-level shape is checked on the raw
//! JSON before the typed decode revives the nested ISO-8601 date strings.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{TrackerError, TrackerResult};
use crate::storage::kv::DurableStore;

/// Expected JSON type of a top-level snapshot field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Object,
    String,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Object => value.is_object(),
            FieldKind::String => value.is_string(),
        }
    }
}

/// Check that `raw` is an object carrying each required field with the
/// expected JSON type.
pub fn validate_shape(raw: &Value, required: &[(&str, FieldKind)]) -> TrackerResult<()> {
    let object = raw
        .as_object()
        .ok_or_else(|| TrackerError::Deserialization("snapshot is not an object".to_string()))?;

    for (field, kind) in required {
        match object.get(*field) {
            Some(value) if kind.matches(value) => {}
            Some(_) => {
                return Err(TrackerError::Deserialization(format!(
                    "field {field} has the wrong type, expected {kind:?}"
                )))
            }
            None => {
                return Err(TrackerError::Deserialization(format!(
                    "missing field {field}"
                )))
            }
        }
    }

    Ok(())
}

/// Parse an ISO-8601 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> TrackerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrackerError::Deserialization(format!("bad timestamp {value:?}: {e}")))
}

/// Validate the shape of `raw` and decode it, reviving date fields.
pub fn revive<T: DeserializeOwned>(raw: Value, required: &[(&str, FieldKind)]) -> TrackerResult<T> {
    validate_shape(&raw, required)?;

    if let Some(Value::String(start)) = raw.get("currentPeriodStart") {
        parse_timestamp(start)?;
    }

    serde_json::from_value(raw).map_err(|e| TrackerError::Deserialization(e.to_string()))
}

/// Load and revive the snapshot under `key`, treating any failure as absent.
pub fn load_snapshot<S, T>(storage: &S, key: &str, required: &[(&str, FieldKind)]) -> Option<T>
where
    S: DurableStore,
    T: DeserializeOwned,
{
    let raw: Value = storage.get(key)?;
    match revive(raw, required) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            tracing::warn!("Discarding stored snapshot {}: {}", key, e);
            None
        }
    }
}

/// Write `snapshot` under `key`.
pub fn persist_snapshot<S, T>(storage: &S, key: &str, snapshot: &T) -> TrackerResult<()>
where
    S: DurableStore,
    T: Serialize,
{
    if storage.set(key, snapshot) {
        Ok(())
    } else {
        Err(TrackerError::Persistence(format!("could not write {key}")))
    }
}
