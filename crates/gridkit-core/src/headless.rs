//! In-memory grid widget
//!
//! `HeadlessGrid` keeps the view state a real grid would (rows with live
//! edits, selection, sort, quick filter) and records every command it
//! receives. Hosts that render the grid themselves drain the recorded
//! commands and mirror user actions back through `select`, `edit_cell`,
//! `set_quick_filter` and `apply_column_state`.

use crate::columns::ColumnSet;
use crate::config::SortDirection;
use crate::error::WidgetCommandError;
use crate::row::{display_text, GridNode, GridRow, Row, RowId};
use crate::widget::{
    CellValueChanged, ColumnSortState, CsvExportParams, GridWidget, SelectionChanged,
    SelectionSource, WidgetCommand,
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A grid widget with no rendering
#[derive(Debug, Default)]
pub struct HeadlessGrid {
    rows: Vec<GridRow>,
    columns: ColumnSet,
    selected: HashSet<RowId>,
    sort: Vec<ColumnSortState>,
    quick_filter: Option<String>,
    commands: Vec<WidgetCommand>,
    unavailable: Option<String>,
}

impl HeadlessGrid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every command with `reason` until cleared with `None`
    pub fn set_unavailable(&mut self, reason: Option<String>) {
        self.unavailable = reason;
    }

    /// Drain the commands received since the last call
    pub fn take_commands(&mut self) -> Vec<WidgetCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Commands received and not yet drained
    pub fn commands(&self) -> &[WidgetCommand] {
        &self.commands
    }

    /// Replace the selection with the given rows, as a user click would
    pub fn select(&mut self, ids: &[RowId]) -> SelectionChanged {
        let known: HashSet<&RowId> = self.rows.iter().map(|r| &r.id).collect();
        self.selected = ids.iter().filter(|id| known.contains(id)).cloned().collect();
        SelectionChanged::new(SelectionSource::UserInteraction)
    }

    /// Set a cell value the way the grid's editor would
    ///
    /// Returns `None` when the row does not exist or the column is not
    /// editable. Date columns convert the typed value first.
    pub fn edit_cell(&mut self, id: &RowId, field: &str, value: Value) -> Option<CellValueChanged> {
        let new_value = match self.columns.find_column(field) {
            Some(column) if !column.editable => return None,
            Some(column) => column.parse_edit(value),
            None => value,
        };

        let row = self.rows.iter_mut().find(|r| &r.id == id)?;
        let old_value = row
            .data
            .insert(field.to_string(), new_value.clone())
            .unwrap_or(Value::Null);
        let node = row.to_node();

        Some(CellValueChanged {
            node,
            field: field.to_string(),
            old_value,
            new_value,
        })
    }

    /// Show only rows with a cell containing `text` (case-insensitive)
    pub fn set_quick_filter(&mut self, text: Option<String>) {
        self.quick_filter = text.filter(|t| !t.trim().is_empty());
    }

    /// Columns last loaded into the grid
    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    fn check_available(&self) -> Result<(), WidgetCommandError> {
        match &self.unavailable {
            Some(reason) => Err(WidgetCommandError::Widget(reason.clone())),
            None => Ok(()),
        }
    }

    fn passes_filter(&self, row: &GridRow) -> bool {
        let Some(needle) = &self.quick_filter else {
            return true;
        };
        let needle = needle.to_lowercase();
        row.data
            .values()
            .any(|v| display_text(v).to_lowercase().contains(&needle))
    }

    /// Loaded rows in sort order (filtering not applied)
    fn ordered(&self) -> Vec<&GridRow> {
        let mut keys: Vec<&ColumnSortState> = self.sort.iter().filter(|s| s.sort.is_some()).collect();
        keys.sort_by_key(|s| s.sort_index.unwrap_or(usize::MAX));

        let mut rows: Vec<&GridRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            keys.iter()
                .map(|key| {
                    let ord = compare_values(a.data.get(&key.col_id), b.data.get(&key.col_id));
                    match key.sort {
                        Some(SortDirection::Desc) => ord.reverse(),
                        _ => ord,
                    }
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => display_text(x).cmp(&display_text(y)),
    }
}

impl GridWidget for HeadlessGrid {
    fn load(&mut self, rows: &[GridRow], columns: &ColumnSet) {
        self.rows = rows.to_vec();
        self.columns = columns.clone();

        // New row data drops the selection, as a grid does on setRowData
        self.selected.clear();

        self.commands.push(WidgetCommand::Load {
            rows: rows.to_vec(),
            columns: columns.clone(),
        });
    }

    fn displayed_row_count(&self) -> usize {
        self.rows.iter().filter(|r| self.passes_filter(r)).count()
    }

    fn selected_rows(&self) -> Vec<Row> {
        self.ordered()
            .into_iter()
            .filter(|r| self.selected.contains(&r.id) && self.passes_filter(r))
            .map(|r| r.data.clone())
            .collect()
    }

    fn deselect_all(&mut self) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        self.selected.clear();
        self.commands.push(WidgetCommand::DeselectAll);
        Ok(())
    }

    fn nodes(&self) -> Vec<GridNode> {
        let mut displayed = 0;
        self.ordered()
            .into_iter()
            .map(|r| {
                let mut node = r.to_node();
                if self.passes_filter(r) {
                    node.displayed_index = Some(displayed);
                    displayed += 1;
                }
                node
            })
            .collect()
    }

    fn column_state(&self) -> Vec<ColumnSortState> {
        self.sort.clone()
    }

    fn apply_column_state(&mut self, state: &[ColumnSortState]) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        if let Some(unknown) = state.iter().find(|s| !self.columns.contains(&s.col_id)) {
            return Err(WidgetCommandError::UnknownColumn(unknown.col_id.clone()));
        }
        self.sort = state.to_vec();
        self.commands.push(WidgetCommand::ApplyColumnState {
            state: state.to_vec(),
        });
        Ok(())
    }

    fn reset_column_state(&mut self) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        self.sort.clear();
        self.commands.push(WidgetCommand::ResetColumnState);
        Ok(())
    }

    fn export_csv(&mut self, params: &CsvExportParams) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        self.commands.push(WidgetCommand::ExportCsv {
            params: params.clone(),
        });
        Ok(())
    }

    fn clear_filter_model(&mut self) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        self.quick_filter = None;
        self.commands.push(WidgetCommand::ClearFilterModel);
        Ok(())
    }

    fn auto_size_all_columns(&mut self) -> Result<(), WidgetCommandError> {
        self.check_available()?;
        self.commands.push(WidgetCommand::AutoSizeAllColumns);
        Ok(())
    }
}
