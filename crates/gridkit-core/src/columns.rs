//! Column schema inference
//!
//! The schema is derived from the first row's keys only. Later rows may carry
//! extra fields, which stay unrendered; fields missing from later rows render
//! as blank cells.

use crate::format::{format_date, format_number, is_valid_url, looks_like_date, parse_date_edit};
use crate::row::{display_text, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of leading rows sampled when deciding whether a column holds dates
const DATE_SAMPLE_ROWS: usize = 3;

/// Glyphs used for boolean cells
const CHECK_GLYPH: &str = "✓";
const CROSS_GLYPH: &str = "✗";

/// Label of the link rendered in URL cells, and the placeholder for bad URLs
const LINK_LABEL: &str = "View";
const PLACEHOLDER: &str = "—";

/// Inferred type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Number,
    Boolean,
    Date,
    Url,
    Text,
}

impl ColumnKind {
    /// Filter the grid should offer for this kind
    pub fn filter(self) -> &'static str {
        match self {
            ColumnKind::Number => "agNumberColumnFilter",
            ColumnKind::Date => "agDateColumnFilter",
            _ => "agTextColumnFilter",
        }
    }

    /// Cell data type handed to the grid
    pub fn cell_data_type(self) -> &'static str {
        match self {
            ColumnKind::Number => "number",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Date => "date",
            ColumnKind::Url | ColumnKind::Text => "text",
        }
    }
}

/// What a cell shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellContent {
    /// Plain or formatted text
    Text(String),
    /// Boolean indicator
    Check(bool),
    /// A link that opens `href`
    Link { href: String },
    /// Shown instead of a link when the URL does not validate
    Placeholder,
}

impl CellContent {
    /// The visible text of the cell
    pub fn label(&self) -> &str {
        match self {
            CellContent::Text(s) => s,
            CellContent::Check(true) => CHECK_GLYPH,
            CellContent::Check(false) => CROSS_GLYPH,
            CellContent::Link { .. } => LINK_LABEL,
            CellContent::Placeholder => PLACEHOLDER,
        }
    }
}

/// A column definition derived from the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    /// Field name in the row
    pub field: String,
    /// Human-readable header
    pub header_name: String,
    /// Inferred type
    pub kind: ColumnKind,
    pub editable: bool,
    pub sortable: bool,
    pub filter: String,
    pub floating_filter: bool,
    pub resizable: bool,
    pub cell_data_type: String,
}

impl ColumnSchema {
    /// Create a column of the given kind. URL columns are never editable.
    pub fn new(field: impl Into<String>, kind: ColumnKind, editing_enabled: bool) -> Self {
        let field = field.into();
        Self {
            header_name: header_label(&field),
            field,
            kind,
            editable: editing_enabled && kind != ColumnKind::Url,
            sortable: true,
            filter: kind.filter().to_string(),
            floating_filter: true,
            resizable: true,
            cell_data_type: kind.cell_data_type().to_string(),
        }
    }

    /// Display string for a value of this column
    pub fn format_value(&self, value: &Value) -> String {
        match (self.kind, value) {
            (_, Value::Null) => String::new(),
            (ColumnKind::Number, Value::Number(n)) => format_number(n),
            (ColumnKind::Date, v) => format_date(v),
            (_, v) => display_text(v),
        }
    }

    /// Convert a value typed into an edited cell
    pub fn parse_edit(&self, value: Value) -> Value {
        match self.kind {
            ColumnKind::Date => parse_date_edit(value),
            _ => value,
        }
    }

    /// What the cell for `value` shows
    pub fn render(&self, value: &Value) -> CellContent {
        match self.kind {
            ColumnKind::Boolean => CellContent::Check(is_truthy(value)),
            ColumnKind::Url => match value.as_str() {
                Some(href) if is_valid_url(value) => CellContent::Link {
                    href: href.to_string(),
                },
                _ => CellContent::Placeholder,
            },
            _ => CellContent::Text(self.format_value(value)),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Columns handed to the grid: inferred, or supplied verbatim by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSet {
    Inferred(Vec<ColumnSchema>),
    Custom(Vec<Value>),
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::Inferred(Vec::new())
    }
}

impl ColumnSet {
    /// Use the host's definitions when there are any, otherwise infer them
    pub fn resolve(column_defs: &[Value], rows: &[Row], editing_enabled: bool) -> Self {
        if column_defs.is_empty() {
            ColumnSet::Inferred(infer_schema(rows, editing_enabled))
        } else {
            ColumnSet::Custom(column_defs.to_vec())
        }
    }

    /// Get the number of columns
    pub fn len(&self) -> usize {
        match self {
            ColumnSet::Inferred(columns) => columns.len(),
            ColumnSet::Custom(defs) => defs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names (or column ids for custom definitions) in column order
    pub fn field_names(&self) -> Vec<&str> {
        match self {
            ColumnSet::Inferred(columns) => columns.iter().map(|c| c.field.as_str()).collect(),
            ColumnSet::Custom(defs) => defs
                .iter()
                .filter_map(|def| {
                    def.get("colId")
                        .or_else(|| def.get("field"))
                        .and_then(Value::as_str)
                })
                .collect(),
        }
    }

    /// Whether a column with this field (or column id) exists
    pub fn contains(&self, field: &str) -> bool {
        self.field_names().contains(&field)
    }

    /// Find an inferred column by field name
    pub fn find_column(&self, field: &str) -> Option<&ColumnSchema> {
        match self {
            ColumnSet::Inferred(columns) => columns.iter().find(|c| c.field == field),
            ColumnSet::Custom(_) => None,
        }
    }
}

/// Column options shared by every column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultColumnDef {
    pub flex: u32,
    pub min_width: u32,
    pub sortable: bool,
    pub filter: bool,
    pub resizable: bool,
    pub editable: bool,
    pub floating_filter: bool,
}

impl DefaultColumnDef {
    pub fn new(editing_enabled: bool) -> Self {
        Self {
            flex: 1,
            min_width: 100,
            sortable: true,
            filter: true,
            resizable: true,
            editable: editing_enabled,
            floating_filter: true,
        }
    }
}

/// Infer one column per key of the first row
pub fn infer_schema(rows: &[Row], editing_enabled: bool) -> Vec<ColumnSchema> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    first
        .iter()
        .map(|(key, value)| ColumnSchema::new(key.clone(), infer_kind(rows, key, value), editing_enabled))
        .collect()
}

fn infer_kind(rows: &[Row], key: &str, first_value: &Value) -> ColumnKind {
    match first_value {
        Value::Number(_) => ColumnKind::Number,
        Value::Bool(_) => ColumnKind::Boolean,
        _ if is_date_column(rows, key) => ColumnKind::Date,
        v if is_valid_url(v) => ColumnKind::Url,
        _ => ColumnKind::Text,
    }
}

/// More than half of the sampled rows must hold a date-like string
fn is_date_column(rows: &[Row], key: &str) -> bool {
    let sample = rows.len().min(DATE_SAMPLE_ROWS);
    let dates = rows[..sample]
        .iter()
        .filter(|row| row.get(key).and_then(Value::as_str).is_some_and(looks_like_date))
        .count();
    dates * 2 > sample
}

/// Header label for a field: camel-case and underscores split into words,
/// first letter capitalized (`firstName` → `First Name`)
///
/// A run of capitals stays one word, so `userID` becomes `User ID` rather
/// than splitting before every capital into `User I D`.
pub fn header_label(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in key.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => key.to_string(),
    }
}
