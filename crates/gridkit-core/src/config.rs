//! Static grid options supplied by the host
//!
//! Every field has a default so hosts may send any subset of options.

use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};

/// Sort direction of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `"desc"` (any case) is descending, everything else ascending
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

fn lenient_direction<'de, D>(deserializer: D) -> std::result::Result<SortDirection, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| SortDirection::parse_lenient(&s)).unwrap_or_default())
}

/// A sort to apply to one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// How rows can be selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    SingleRow,
    MultiRow,
}

impl SelectionMode {
    /// Multi-row selection shows a select-all checkbox in the header
    pub fn header_checkbox(self) -> bool {
        self == SelectionMode::MultiRow
    }
}

/// Grid options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    pub enable_row_selection: bool,
    pub multi_row_selection: bool,
    pub enable_pagination: bool,
    pub page_size: i64,
    pub enable_editing: bool,
    /// Column sorted after load; empty for none
    pub default_sort_column: String,
    #[serde(deserialize_with = "lenient_direction")]
    pub default_sort_direction: SortDirection,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enable_row_selection: true,
            multi_row_selection: true,
            enable_pagination: false,
            page_size: 50,
            enable_editing: false,
            default_sort_column: String::new(),
            default_sort_direction: SortDirection::Asc,
        }
    }
}

impl GridConfig {
    /// Parse options from the host's JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The configured default sort, if a column is named
    pub fn default_sort(&self) -> Option<SortSpec> {
        let column = self.default_sort_column.trim();
        if column.is_empty() {
            return None;
        }
        Some(SortSpec {
            column: column.to_string(),
            direction: self.default_sort_direction,
        })
    }

    /// Selection mode, or `None` when selection is disabled
    pub fn selection_mode(&self) -> Option<SelectionMode> {
        if !self.enable_row_selection {
            return None;
        }
        Some(if self.multi_row_selection {
            SelectionMode::MultiRow
        } else {
            SelectionMode::SingleRow
        })
    }

    /// Rows per page, at least one
    pub fn effective_page_size(&self) -> usize {
        usize::try_from(self.page_size.max(1)).unwrap_or(1)
    }
}
