//! Interface of the grid widget the session drives
//!
//! The widget renders rows, owns transient view state (sort, filter,
//! selection) and reports events. The session pushes data and commands into
//! it and reads its view state back when reconciling.

use crate::columns::ColumnSet;
use crate::config::SortDirection;
use crate::error::WidgetCommandError;
use crate::row::{GridNode, GridRow, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort state of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSortState {
    pub col_id: String,
    pub sort: Option<SortDirection>,
    #[serde(default)]
    pub sort_index: Option<usize>,
}

/// Options for the widget's CSV export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvExportParams {
    pub file_name: String,
    pub only_selected: bool,
}

/// What caused a selection change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionSource {
    /// Clicks, checkboxes, keyboard
    UserInteraction,
    /// Programmatic selection through the widget API
    Api,
    /// Side effect of the widget receiving new row data
    RowDataChanged,
}

impl SelectionSource {
    /// Map a widget event-source tag (`"rowDataChanged"`, `"api"`, ...)
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "rowDataChanged" => SelectionSource::RowDataChanged,
            "api" | "apiSelectAll" | "apiSelectAllFiltered" | "apiSelectAllCurrentPage" => {
                SelectionSource::Api
            }
            _ => SelectionSource::UserInteraction,
        }
    }
}

/// Selection-changed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChanged {
    pub source: SelectionSource,
}

impl SelectionChanged {
    pub fn new(source: SelectionSource) -> Self {
        Self { source }
    }
}

/// Cell-edited event, carrying the node after the edit was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellValueChanged {
    pub node: GridNode,
    pub field: String,
    #[serde(default)]
    pub old_value: Value,
    #[serde(default)]
    pub new_value: Value,
}

/// A command the session sent to the widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum WidgetCommand {
    Load { rows: Vec<GridRow>, columns: ColumnSet },
    ApplyColumnState { state: Vec<ColumnSortState> },
    ResetColumnState,
    ExportCsv { params: CsvExportParams },
    ClearFilterModel,
    AutoSizeAllColumns,
    DeselectAll,
}

/// The grid widget as seen by the session
pub trait GridWidget {
    /// Replace the grid's rows and columns
    fn load(&mut self, rows: &[GridRow], columns: &ColumnSet);

    /// Number of rows currently displayed (after filtering)
    fn displayed_row_count(&self) -> usize;

    /// Data of the selected rows, in display order
    fn selected_rows(&self) -> Vec<Row>;

    /// Clear the selection
    fn deselect_all(&mut self) -> Result<(), WidgetCommandError>;

    /// Every materialized row, edits included, in display order
    fn nodes(&self) -> Vec<GridNode>;

    /// Current per-column sort state
    fn column_state(&self) -> Vec<ColumnSortState>;

    /// Apply sort state; columns not listed lose their sort
    fn apply_column_state(&mut self, state: &[ColumnSortState]) -> Result<(), WidgetCommandError>;

    /// Restore the initial column state
    fn reset_column_state(&mut self) -> Result<(), WidgetCommandError>;

    /// Serialize rows to CSV using the widget's own exporter
    fn export_csv(&mut self, params: &CsvExportParams) -> Result<(), WidgetCommandError>;

    /// Remove every active filter
    fn clear_filter_model(&mut self) -> Result<(), WidgetCommandError>;

    /// Fit every column to its content
    fn auto_size_all_columns(&mut self) -> Result<(), WidgetCommandError>;
}
