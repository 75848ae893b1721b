//! Row identity resolution
//!
//! Identity precedence, first match wins:
//! 1. a non-null `id` field
//! 2. a non-null `_id` field
//! 3. `row-{position}` when the load position is known
//! 4. `row-hash-{len}-{prefix}` built from the compact JSON serialization
//! 5. `row-{millis}-{random}` when the row cannot be serialized
//!
//! Step 5 is not stable between calls. Session code always passes the load
//! position, so it only applies to callers resolving rows without one.

use crate::error::SerializationError;
use crate::row::{Row, RowId};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Number of serialized characters kept in a fingerprint identity
const FINGERPRINT_PREFIX_CHARS: usize = 20;

/// Resolve the identity of a row. Never fails.
pub fn resolve_id(row: &Row, position: Option<usize>) -> RowId {
    if let Some(id) = explicit_id(row) {
        return id;
    }

    match position {
        Some(position) => RowId::new(format!("row-{position}")),
        None => fingerprint_id(row),
    }
}

/// The identity carried by the row itself (`id`, then `_id`), if any
pub fn explicit_id(row: &Row) -> Option<RowId> {
    ["id", "_id"].iter().find_map(|key| match row.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(RowId::new(s.clone())),
        Some(other) => Some(RowId::new(other.to_string())),
    })
}

/// Identity derived from the serialized form of a row
///
/// Structurally identical rows get the same identity. Falls back to a
/// time/random identity when serialization fails.
pub fn fingerprint_id<T: Serialize + ?Sized>(row: &T) -> RowId {
    match serialize_compact(row) {
        Ok(serialized) => {
            let prefix: String = serialized.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
            RowId::new(format!("row-hash-{}-{}", serialized.len(), prefix))
        }
        Err(err) => {
            warn!(error = %err, "row is not serializable, assigning a volatile identity");
            volatile_id()
        }
    }
}

fn serialize_compact<T: Serialize + ?Sized>(row: &T) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(row)?)
}

fn volatile_id() -> RowId {
    RowId::new(format!(
        "row-{}-{:016x}",
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    ))
}
