//! Core row types shared by the normalizer, the grid and the session

use crate::identity::resolve_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single record: field name to JSON value. Fields vary per dataset.
pub type Row = Map<String, Value>;

/// Opaque identity of a row, unique within one loaded dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Create a new row identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A loaded row: its data, its position in the loaded dataset and its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    /// Identity assigned at load time
    pub id: RowId,
    /// Index of the row in the canonical sequence
    pub position: usize,
    /// Field values
    pub data: Row,
}

impl GridRow {
    /// Build a loaded row, resolving its identity from the data and position
    pub fn new(data: Row, position: usize) -> Self {
        let id = resolve_id(&data, Some(position));
        Self { id, position, data }
    }

    /// The node the grid materializes for this row
    pub fn to_node(&self) -> GridNode {
        GridNode {
            data: self.data.clone(),
            source_index: Some(self.position),
            displayed_index: None,
        }
    }
}

/// A row as currently materialized by the grid widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridNode {
    /// Field values, including any edits the grid applied
    pub data: Row,
    /// Position of the row in the loaded dataset, if the grid knows it
    #[serde(default)]
    pub source_index: Option<usize>,
    /// Position of the row in the current sorted/filtered display
    #[serde(default)]
    pub displayed_index: Option<usize>,
}

impl GridNode {
    /// Identity of this node, derived the same way as at load time
    pub fn id(&self) -> RowId {
        resolve_id(&self.data, self.source_index)
    }
}

/// JSON type name of a value, used for diagnostics
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text shown for a value in plain cells and CSV-like contexts
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
