//! Grid session
//!
//! `GridSession` owns the loaded dataset, the edit set and the published
//! views. The host feeds it input on every render and forwards widget events;
//! the session keeps the output channels consistent with what the user did.
//!
//! ```text
//! Empty --set_input(ok)--> Loaded --cell edit--> Dirty
//!   ^                        ^                     |
//!   +--set_input(failed)     +-------reload--------+
//! ```

use crate::columns::{ColumnSet, DefaultColumnDef};
use crate::config::{GridConfig, SelectionMode, SortSpec};
use crate::dataset::DatasetSnapshot;
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::edits::EditTracker;
use crate::error::{Result, WidgetCommandError};
use crate::normalize::{select_source, DataDiagnostic};
use crate::outputs::{Notice, OutputChannels};
use crate::row::{GridNode, RowId};
use crate::widget::{
    CellValueChanged, ColumnSortState, CsvExportParams, GridWidget, SelectionChanged,
    SelectionSource,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Time the widget needs after `ready` before column state can be applied
pub const SORT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Loop-detector key for input deliveries
const INPUT_KEY: &str = "input";

const NO_SELECTION_NOTICE: &str = "No rows selected. Please select rows to export.";

/// Data delivered by the host on every render
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridInput {
    pub row_data: Value,
    /// Used only when `row_data` is absent or empty
    pub alternative_data: Value,
    /// Column definitions that replace inference when non-empty
    #[serde(deserialize_with = "null_as_empty")]
    pub column_defs: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GridInput {
    /// Input with row data only
    pub fn rows(row_data: Value) -> Self {
        Self {
            row_data,
            ..Self::default()
        }
    }

    /// Parse input from the host's JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No dataset loaded, or the last input could not be normalized
    #[default]
    Empty,
    /// A dataset is loaded and unedited
    Loaded,
    /// At least one cell was edited since the last load
    Dirty,
}

/// Counters shown in the status bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStats {
    /// Rows displayed after filtering
    pub total_rows: usize,
    pub selected_count: usize,
    pub edited_count: usize,
}

/// Options the host hands to the widget when creating it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub default_col_def: DefaultColumnDef,
    pub column_defs: ColumnSet,
    /// `None` when row selection is disabled
    pub row_selection: Option<SelectionMode>,
    pub header_checkbox: bool,
    pub pagination: bool,
    pub page_size: usize,
}

/// Result of a command forwarded to the widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Skipped(WidgetCommandError),
}

impl CommandOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, CommandOutcome::Done)
    }
}

/// Default sort waiting for the widget to settle
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSort {
    fire_at: Instant,
    generation: u64,
    sort: SortSpec,
}

/// `export_YYYY-MM-DD.csv` style file name
pub fn export_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, date.format("%Y-%m-%d"))
}

/// Reconciles host input, widget events and output channels
pub struct GridSession<W: GridWidget, O: OutputChannels> {
    config: GridConfig,
    outputs: O,
    widget: Option<W>,
    diagnostics: Rc<Diagnostics>,
    state: SessionState,
    input: Option<GridInput>,
    snapshot: DatasetSnapshot,
    edits: EditTracker,
    stats: GridStats,
    diagnostic: Option<DataDiagnostic>,
    pending_sort: Option<PendingSort>,
    generation: u64,
    ready: bool,
}

impl<W: GridWidget, O: OutputChannels> GridSession<W, O> {
    /// Create a session with its own diagnostics
    pub fn new(config: GridConfig, outputs: O) -> Self {
        Self::with_diagnostics(config, outputs, Rc::new(Diagnostics::new()))
    }

    /// Create a session reporting into shared diagnostics
    pub fn with_diagnostics(config: GridConfig, outputs: O, diagnostics: Rc<Diagnostics>) -> Self {
        Self {
            config,
            outputs,
            widget: None,
            diagnostics,
            state: SessionState::Empty,
            input: None,
            snapshot: DatasetSnapshot::default(),
            edits: EditTracker::new(),
            stats: GridStats::default(),
            diagnostic: None,
            pending_sort: None,
            generation: 0,
            ready: false,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> GridStats {
        self.stats
    }

    pub fn snapshot(&self) -> &DatasetSnapshot {
        &self.snapshot
    }

    pub fn edits(&self) -> &EditTracker {
        &self.edits
    }

    /// Why the last input could not be loaded
    pub fn diagnostic(&self) -> Option<&DataDiagnostic> {
        self.diagnostic.as_ref()
    }

    pub fn diagnostics(&self) -> &Rc<Diagnostics> {
        &self.diagnostics
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }

    pub fn widget(&self) -> Option<&W> {
        self.widget.as_ref()
    }

    pub fn widget_mut(&mut self) -> Option<&mut W> {
        self.widget.as_mut()
    }

    /// Number of loads so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Widget options derived from the config and the loaded columns
    pub fn widget_options(&self) -> WidgetOptions {
        let row_selection = self.config.selection_mode();
        WidgetOptions {
            default_col_def: DefaultColumnDef::new(self.config.enable_editing),
            column_defs: self.snapshot.columns.clone(),
            row_selection,
            header_checkbox: row_selection.is_some_and(SelectionMode::header_checkbox),
            pagination: self.config.enable_pagination,
            page_size: self.config.effective_page_size(),
        }
    }

    /// When `poll` next has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_sort.as_ref().map(|task| task.fire_at)
    }

    /// Deliver the host's current input
    ///
    /// Input equal to the previous delivery changes nothing; edits survive.
    pub fn set_input(&mut self, input: GridInput) {
        if self.input.as_ref() == Some(&input) {
            self.diagnostics.record_redundant(INPUT_KEY);
            debug!(generation = self.generation, "input unchanged, keeping current dataset");
            return;
        }

        self.diagnostics.record_distinct(INPUT_KEY);
        self.input = Some(input);
        self.load();
    }

    /// Attach the widget and push the current dataset into it
    pub fn mount(&mut self, mut widget: W) {
        widget.load(&self.snapshot.rows, &self.snapshot.columns);
        self.widget = Some(widget);
        self.ready = false;
        debug!(rows = self.snapshot.row_count(), "grid mounted");
    }

    /// Detach the widget. Pending tasks fail softly when they fire.
    pub fn unmount(&mut self) -> Option<W> {
        self.ready = false;
        debug!("grid unmounted");
        self.widget.take()
    }

    /// The widget finished initializing
    pub fn on_ready(&mut self, now: Instant) {
        if self.widget.is_none() {
            warn!("ready event without a mounted grid, ignoring");
            return;
        }
        self.ready = true;
        self.refresh_stats();
        info!(
            rows = self.stats.total_rows,
            selection = ?self.config.selection_mode(),
            "grid ready"
        );
        self.schedule_default_sort(now);
    }

    /// Run deferred work that is due. Returns the outcome of a task that ran.
    pub fn poll(&mut self, now: Instant) -> Option<CommandOutcome> {
        match &self.pending_sort {
            Some(task) if task.fire_at <= now => {}
            _ => return None,
        }
        let task = self.pending_sort.take()?;

        if task.generation != self.generation {
            debug!(
                task_generation = task.generation,
                generation = self.generation,
                "discarding default sort for a replaced dataset"
            );
            return None;
        }

        let state = [ColumnSortState {
            col_id: task.sort.column.clone(),
            sort: Some(task.sort.direction),
            sort_index: Some(0),
        }];
        let result = match self.widget.as_mut() {
            Some(widget) => widget.apply_column_state(&state),
            None => Err(WidgetCommandError::NotMounted),
        };

        match result {
            Ok(()) => {
                debug!(column = %task.sort.column, direction = ?task.sort.direction, "default sort applied");
                Some(CommandOutcome::Done)
            }
            Err(err) => {
                self.diagnostics.record_error(
                    ErrorKind::Grid,
                    format!("failed to apply default sort: {err}"),
                    Some(json!({ "column": task.sort.column })),
                );
                Some(CommandOutcome::Skipped(err))
            }
        }
    }

    /// The widget's selection changed
    pub fn on_selection_changed(&mut self, event: SelectionChanged) {
        let Some(widget) = self.widget.as_ref() else {
            warn!("selection event without a mounted grid, ignoring");
            return;
        };
        let selected = widget.selected_rows();

        if event.source == SelectionSource::RowDataChanged && selected.is_empty() {
            debug!(source = ?event.source, "ignoring selection cleared by new row data");
            return;
        }

        debug!(source = ?event.source, selected = selected.len(), "selection changed");
        self.outputs.set_selected_rows(selected);
        self.refresh_stats();
    }

    /// A cell was edited in the widget
    pub fn on_cell_value_changed(&mut self, event: CellValueChanged) {
        let Some(position) = self.edited_position(&event.node) else {
            warn!(field = %event.field, "edit for a row that is not loaded, ignoring");
            self.diagnostics.record_error(
                ErrorKind::Grid,
                "cell edit for an unknown row",
                Some(json!({ "field": event.field, "node": event.node.data })),
            );
            return;
        };

        self.snapshot.apply_edit(position, &event.field, event.new_value);
        if let Some(row) = self.snapshot.rows.get(position) {
            debug!(id = %row.id, position, field = %event.field, "cell value changed");
            self.edits.record_edit(row.id.clone());
        }

        let (all_rows, changed_rows) = match self.widget.as_ref() {
            Some(widget) => {
                let mut nodes = widget.nodes();
                nodes.sort_by_key(|node| node.source_index.unwrap_or(usize::MAX));
                let changed = self
                    .edits
                    .snapshot_changed(&nodes, |node| self.node_identity(node));
                (
                    nodes.into_iter().map(|n| n.data).collect(),
                    changed.into_iter().map(|n| n.data).collect(),
                )
            }
            None => {
                let changed = self.edits.snapshot_changed(&self.snapshot.rows, |r| r.id.clone());
                (
                    self.snapshot.rows_data(),
                    changed.into_iter().map(|r| r.data).collect(),
                )
            }
        };

        self.outputs.set_edited_data(all_rows);
        self.outputs.set_changed_rows(changed_rows);
        self.state = SessionState::Dirty;
        self.refresh_stats();
    }

    /// The widget's filter changed
    pub fn on_filter_changed(&mut self) {
        self.refresh_stats();
        debug!(displayed = self.stats.total_rows, "filter changed");
    }

    /// The widget's sort changed
    pub fn on_sort_changed(&mut self) {
        if let Some(widget) = self.widget.as_ref() {
            let model: Vec<ColumnSortState> = widget
                .column_state()
                .into_iter()
                .filter(|c| c.sort.is_some())
                .collect();
            debug!(?model, "sort changed");
        }
    }

    /// Load the last input again, discarding edits
    ///
    /// Returns false when there is nothing to reload or the input is invalid.
    pub fn reload(&mut self, now: Instant) -> bool {
        if self.input.is_none() {
            warn!("reload requested before any input was delivered");
            self.outputs.show_notice(Notice::warning("Nothing to reload yet."));
            return false;
        }

        info!(generation = self.generation, "reloading data");
        let loaded = self.load();
        if loaded && self.ready {
            self.schedule_default_sort(now);
        }
        loaded
    }

    /// Export every displayed row to CSV
    pub fn export_all(&mut self) -> CommandOutcome {
        let params = CsvExportParams {
            file_name: export_file_name("export", Utc::now().date_naive()),
            only_selected: false,
        };
        let rows = self.stats.total_rows;
        let outcome = self.run_command("export to CSV", |w| w.export_csv(&params));
        if outcome.is_done() {
            info!(file = %params.file_name, rows, "CSV exported");
            self.outputs
                .show_notice(Notice::info(format!("Exported {}", params.file_name)));
        }
        outcome
    }

    /// Export the selected rows to CSV
    pub fn export_selected(&mut self) -> CommandOutcome {
        let selected = match self.widget.as_ref() {
            Some(widget) => widget.selected_rows().len(),
            None => return self.run_command("export selected rows", |_| Ok(())),
        };
        if selected == 0 {
            debug!("export of selection requested with nothing selected");
            self.outputs.show_notice(Notice::warning(NO_SELECTION_NOTICE));
            return CommandOutcome::Skipped(WidgetCommandError::EmptySelection);
        }

        let params = CsvExportParams {
            file_name: export_file_name("export_selected", Utc::now().date_naive()),
            only_selected: true,
        };
        let outcome = self.run_command("export selected rows", |w| w.export_csv(&params));
        if outcome.is_done() {
            info!(file = %params.file_name, rows = selected, "CSV exported (selected only)");
            self.outputs.show_notice(Notice::info(format!(
                "Exported {} selected rows to {}",
                selected, params.file_name
            )));
        }
        outcome
    }

    pub fn clear_filters(&mut self) -> CommandOutcome {
        let outcome = self.run_command("clear filters", |w| w.clear_filter_model());
        if outcome.is_done() {
            self.refresh_stats();
        }
        outcome
    }

    pub fn auto_size_columns(&mut self) -> CommandOutcome {
        self.run_command("auto-size columns", |w| w.auto_size_all_columns())
    }

    pub fn reset_column_state(&mut self) -> CommandOutcome {
        self.run_command("reset columns", |w| w.reset_column_state())
    }

    /// Deselect every row and publish the empty selection
    pub fn clear_selection(&mut self) -> CommandOutcome {
        let outcome = self.run_command("clear selection", |w| w.deselect_all());
        if outcome.is_done() {
            self.outputs.set_selected_rows(Vec::new());
            self.refresh_stats();
        }
        outcome
    }

    /// Normalize the current input and replace the dataset
    fn load(&mut self) -> bool {
        let Some(input) = self.input.as_ref() else {
            return false;
        };
        self.generation += 1;
        self.edits.reset();

        let source = select_source(&input.row_data, &input.alternative_data);
        match DatasetSnapshot::load(
            source,
            &input.column_defs,
            self.config.enable_editing,
            self.generation,
        ) {
            Ok(snapshot) => {
                let duplicates = snapshot.duplicate_ids();
                if !duplicates.is_empty() {
                    warn!(count = duplicates.len(), first = %duplicates[0], "duplicate row ids in dataset");
                }
                info!(
                    generation = self.generation,
                    rows = snapshot.row_count(),
                    columns = snapshot.columns.len(),
                    "dataset loaded"
                );
                self.snapshot = snapshot;
                self.diagnostic = None;
                self.state = SessionState::Loaded;
            }
            Err(err) => {
                let diagnostic = DataDiagnostic::describe(&err, &input.row_data, &input.alternative_data);
                self.diagnostics.record_error(
                    ErrorKind::Data,
                    err.to_string(),
                    Some(json!({ "rawType": diagnostic.raw_type })),
                );
                self.snapshot = DatasetSnapshot {
                    generation: self.generation,
                    ..DatasetSnapshot::default()
                };
                self.diagnostic = Some(diagnostic);
                self.state = SessionState::Empty;
            }
        }

        if let Some(widget) = self.widget.as_mut() {
            widget.load(&self.snapshot.rows, &self.snapshot.columns);
        }
        self.outputs.set_edited_data(self.snapshot.rows_data());
        self.outputs.set_changed_rows(Vec::new());
        self.outputs.set_selected_rows(Vec::new());
        self.refresh_stats();

        self.state != SessionState::Empty
    }

    fn schedule_default_sort(&mut self, now: Instant) {
        self.pending_sort = self.config.default_sort().map(|sort| {
            debug!(column = %sort.column, generation = self.generation, "default sort scheduled");
            PendingSort {
                fire_at: now + SORT_SETTLE_DELAY,
                generation: self.generation,
                sort,
            }
        });
    }

    /// Snapshot position of a node
    ///
    /// The load position wins over the node's data, which may have had its
    /// `id` cell edited. Nodes without a position are looked up by identity.
    fn edited_position(&self, node: &GridNode) -> Option<usize> {
        match node.source_index {
            Some(position) if position < self.snapshot.row_count() => Some(position),
            _ => self.snapshot.position_of(&node.id()),
        }
    }

    /// Identity assigned to a node's row at load time
    fn node_identity(&self, node: &GridNode) -> RowId {
        self.edited_position(node)
            .and_then(|position| self.snapshot.rows.get(position))
            .map(|row| row.id.clone())
            .unwrap_or_else(|| node.id())
    }

    fn refresh_stats(&mut self) {
        self.stats = match self.widget.as_ref() {
            Some(widget) => GridStats {
                total_rows: widget.displayed_row_count(),
                selected_count: widget.selected_rows().len(),
                edited_count: self.edits.len(),
            },
            None => GridStats {
                total_rows: self.snapshot.row_count(),
                selected_count: 0,
                edited_count: self.edits.len(),
            },
        };
    }

    fn run_command<F>(&mut self, name: &str, command: F) -> CommandOutcome
    where
        F: FnOnce(&mut W) -> std::result::Result<(), WidgetCommandError>,
    {
        let result = match self.widget.as_mut() {
            Some(widget) => command(widget),
            None => Err(WidgetCommandError::NotMounted),
        };

        match result {
            Ok(()) => {
                debug!(command = name, "grid command done");
                CommandOutcome::Done
            }
            Err(err) => {
                warn!(command = name, error = %err, "grid command skipped");
                self.diagnostics
                    .record_error(ErrorKind::Grid, format!("{name} failed: {err}"), None);
                self.outputs
                    .show_notice(Notice::error(format!("Could not {name}: {err}")));
                CommandOutcome::Skipped(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{ColumnKind, ColumnSet};
    use crate::config::SortDirection;
    use crate::headless::HeadlessGrid;
    use crate::outputs::{NoticeLevel, RecordedOutputs};
    use crate::row::Row;
    use crate::widget::WidgetCommand;
    use serde_json::json;

    type Session = GridSession<HeadlessGrid, RecordedOutputs>;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| row(v.clone()))
            .collect()
    }

    fn editing_config() -> GridConfig {
        GridConfig {
            enable_editing: true,
            ..GridConfig::default()
        }
    }

    fn mounted(config: GridConfig, data: Value) -> Session {
        let mut session = Session::new(config, RecordedOutputs::new());
        session.mount(HeadlessGrid::new());
        session.set_input(GridInput::rows(data));
        session
    }

    fn grid(session: &mut Session) -> &mut HeadlessGrid {
        session.widget_mut().unwrap()
    }

    fn edit(session: &mut Session, id: &str, field: &str, value: Value) {
        let event = grid(session).edit_cell(&RowId::new(id), field, value).unwrap();
        session.on_cell_value_changed(event);
    }

    #[test]
    fn test_edit_publishes_changed_rows() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
        assert_eq!(session.state(), SessionState::Loaded);

        edit(&mut session, "2", "name", json!("B"));

        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.outputs().changed_rows(), rows(json!([{"id": 2, "name": "B"}])).as_slice());
        assert_eq!(
            session.outputs().edited_data(),
            rows(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "B"}])).as_slice()
        );
        assert_eq!(session.stats().edited_count, 1);
        assert_eq!(session.snapshot().rows[1].data["name"], json!("B"));
    }

    #[test]
    fn test_repeated_edits_count_once() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}]));
        edit(&mut session, "1", "name", json!("b"));
        edit(&mut session, "1", "name", json!("c"));

        assert_eq!(session.edits().len(), 1);
        assert_eq!(session.outputs().changed_rows(), rows(json!([{"id": 1, "name": "c"}])).as_slice());
    }

    #[test]
    fn test_reload_resets_views() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
        edit(&mut session, "1", "name", json!("z"));

        assert!(session.reload(Instant::now()));

        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.edits().is_empty());
        assert!(session.outputs().changed_rows().is_empty());
        assert!(session.outputs().selected_rows().is_empty());
        assert_eq!(
            session.outputs().edited_data(),
            rows(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])).as_slice()
        );
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_reload_clears_selection() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}, {"id": 2}]));
        grid(&mut session).select(&[RowId::new("1")]);
        session.on_selection_changed(SelectionChanged::new(SelectionSource::UserInteraction));
        assert_eq!(session.stats().selected_count, 1);

        assert!(session.reload(Instant::now()));

        assert!(session.outputs().selected_rows().is_empty());
        assert_eq!(session.stats().selected_count, 0);
        assert!(grid(&mut session).selected_rows().is_empty());
    }

    #[test]
    fn test_reload_without_input() {
        let mut session = Session::new(GridConfig::default(), RecordedOutputs::new());
        assert!(!session.reload(Instant::now()));
        assert_eq!(session.outputs().notices().len(), 1);
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn test_redundant_input_keeps_edits() {
        let data = json!([{"id": 1, "name": "a"}]);
        let mut session = mounted(editing_config(), data.clone());
        edit(&mut session, "1", "name", json!("b"));

        session.set_input(GridInput::rows(data.clone()));
        session.set_input(GridInput::rows(data));

        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.generation(), 1);
        assert_eq!(session.outputs().changed_rows().len(), 1);
        assert_eq!(session.diagnostics().redundant_count(INPUT_KEY), 2);
    }

    #[test]
    fn test_new_input_replaces_dataset() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}]));
        edit(&mut session, "1", "name", json!("b"));

        session.set_input(GridInput::rows(json!({"results": [{"id": 5}]})));

        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.edits().is_empty());
        assert_eq!(session.outputs().edited_data(), rows(json!([{"id": 5}])).as_slice());
        assert_eq!(session.diagnostics().redundant_count(INPUT_KEY), 0);
    }

    #[test]
    fn test_invalid_input_produces_diagnostic() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}]));
        session.set_input(GridInput::rows(json!([1, 2, 3])));

        assert_eq!(session.state(), SessionState::Empty);
        let diagnostic = session.diagnostic().unwrap();
        assert_eq!(diagnostic.row_count, Some(3));
        assert_eq!(diagnostic.raw_type, "array");
        assert!(session.outputs().edited_data().is_empty());
        assert_eq!(session.diagnostics().errors_of_kind(ErrorKind::Data).len(), 1);
        assert_eq!(session.widget().unwrap().displayed_row_count(), 0);

        session.set_input(GridInput::rows(json!([{"id": 2}])));
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.diagnostic().is_none());
    }

    #[test]
    fn test_alternative_data_is_used_when_primary_is_empty() {
        let mut session = mounted(GridConfig::default(), Value::Null);
        session.set_input(GridInput {
            row_data: json!([]),
            alternative_data: json!([{"id": 1}]),
            column_defs: Vec::new(),
        });

        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.snapshot().row_count(), 1);
    }

    #[test]
    fn test_column_inference_through_session() {
        let session = mounted(
            editing_config(),
            json!([{"price": 1000, "active": true, "site": "https://x.com", "joined": "2024-01-01"}]),
        );

        let ColumnSet::Inferred(columns) = &session.snapshot().columns else {
            panic!("expected inferred columns");
        };
        let kinds: Vec<ColumnKind> = columns.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Number, ColumnKind::Boolean, ColumnKind::Url, ColumnKind::Date]
        );
        assert!(!columns[2].editable);
        assert!(columns[0].editable);
    }

    #[test]
    fn test_selection_guard() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}, {"id": 2}]));

        grid(&mut session).select(&[RowId::new("2")]);
        session.on_selection_changed(SelectionChanged::new(SelectionSource::UserInteraction));
        assert_eq!(session.outputs().selected_rows(), rows(json!([{"id": 2}])).as_slice());
        assert_eq!(session.stats().selected_count, 1);

        // A reload-triggered clear with nothing selected is ignored
        grid(&mut session).select(&[]);
        let before = session.outputs().update_counts().selected_rows;
        session.on_selection_changed(SelectionChanged::new(SelectionSource::RowDataChanged));
        assert_eq!(session.outputs().update_counts().selected_rows, before);

        // A user deselecting everything is honored
        session.on_selection_changed(SelectionChanged::new(SelectionSource::UserInteraction));
        assert!(session.outputs().selected_rows().is_empty());
        assert_eq!(session.outputs().update_counts().selected_rows, before + 1);
    }

    #[test]
    fn test_export_selected_with_empty_selection() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}]));
        grid(&mut session).take_commands();
        let counts = session.outputs().update_counts();

        let outcome = session.export_selected();

        assert_eq!(outcome, CommandOutcome::Skipped(WidgetCommandError::EmptySelection));
        assert_eq!(session.outputs().update_counts(), counts);
        assert!(grid(&mut session).commands().is_empty());
        let notices = session.outputs_mut().take_notices();
        assert_eq!(notices[0].message, NO_SELECTION_NOTICE);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn test_export_commands() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}, {"id": 2}]));
        grid(&mut session).take_commands();

        assert!(session.export_all().is_done());
        grid(&mut session).select(&[RowId::new("1")]);
        assert!(session.export_selected().is_done());

        let commands = grid(&mut session).take_commands();
        let params: Vec<CsvExportParams> = commands
            .into_iter()
            .filter_map(|c| match c {
                WidgetCommand::ExportCsv { params } => Some(params),
                _ => None,
            })
            .collect();
        assert_eq!(params.len(), 2);
        assert!(params[0].file_name.starts_with("export_"));
        assert!(!params[0].only_selected);
        assert!(params[1].file_name.starts_with("export_selected_"));
        assert!(params[1].only_selected);

        let notices = session.outputs_mut().take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Info));
        assert_eq!(notices[0].message, format!("Exported {}", params[0].file_name));
        assert_eq!(
            notices[1].message,
            format!("Exported 1 selected rows to {}", params[1].file_name)
        );
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name("export", date), "export_2024-03-09.csv");
        assert_eq!(export_file_name("export_selected", date), "export_selected_2024-03-09.csv");
    }

    #[test]
    fn test_commands_without_widget_are_skipped() {
        let mut session = Session::new(GridConfig::default(), RecordedOutputs::new());
        session.set_input(GridInput::rows(json!([{"id": 1}])));

        assert_eq!(session.auto_size_columns(), CommandOutcome::Skipped(WidgetCommandError::NotMounted));
        assert_eq!(session.export_selected(), CommandOutcome::Skipped(WidgetCommandError::NotMounted));
        assert_eq!(session.outputs().notices().len(), 2);
        assert_eq!(session.diagnostics().errors_of_kind(ErrorKind::Grid).len(), 2);
    }

    #[test]
    fn test_widget_failure_becomes_notice() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}]));
        grid(&mut session).set_unavailable(Some("detached".to_string()));

        let outcome = session.clear_filters();

        assert_eq!(outcome, CommandOutcome::Skipped(WidgetCommandError::Widget("detached".to_string())));
        assert_eq!(session.outputs().notices()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn test_pass_through_commands() {
        let mut session = mounted(GridConfig::default(), json!([{"id": 1}]));
        grid(&mut session).select(&[RowId::new("1")]);
        grid(&mut session).take_commands();

        assert!(session.clear_filters().is_done());
        assert!(session.auto_size_columns().is_done());
        assert!(session.reset_column_state().is_done());
        assert!(session.clear_selection().is_done());

        assert_eq!(
            grid(&mut session).take_commands(),
            vec![
                WidgetCommand::ClearFilterModel,
                WidgetCommand::AutoSizeAllColumns,
                WidgetCommand::ResetColumnState,
                WidgetCommand::DeselectAll,
            ]
        );
        assert_eq!(session.stats().selected_count, 0);
    }

    #[test]
    fn test_default_sort_after_settle_delay() {
        let config = GridConfig {
            default_sort_column: "name".to_string(),
            default_sort_direction: SortDirection::Desc,
            ..GridConfig::default()
        };
        let mut session = mounted(config, json!([{"name": "a"}, {"name": "b"}]));
        let start = Instant::now();
        session.on_ready(start);

        assert_eq!(session.poll(start + Duration::from_millis(50)), None);
        assert_eq!(session.next_deadline(), Some(start + SORT_SETTLE_DELAY));
        assert_eq!(session.poll(start + SORT_SETTLE_DELAY), Some(CommandOutcome::Done));
        assert_eq!(session.next_deadline(), None);

        let nodes = session.widget().unwrap().nodes();
        assert_eq!(nodes[0].data["name"], json!("b"));
    }

    #[test]
    fn test_stale_default_sort_is_discarded() {
        let config = GridConfig {
            default_sort_column: "name".to_string(),
            ..GridConfig::default()
        };
        let mut session = mounted(config, json!([{"name": "b"}, {"name": "a"}]));
        let start = Instant::now();
        session.on_ready(start);
        grid(&mut session).take_commands();

        session.set_input(GridInput::rows(json!([{"name": "c"}])));

        assert_eq!(session.poll(start + Duration::from_secs(1)), None);
        let sorted = grid(&mut session)
            .take_commands()
            .into_iter()
            .any(|c| matches!(c, WidgetCommand::ApplyColumnState { .. }));
        assert!(!sorted);
    }

    #[test]
    fn test_reload_reschedules_default_sort() {
        let config = GridConfig {
            default_sort_column: "name".to_string(),
            ..GridConfig::default()
        };
        let mut session = mounted(config, json!([{"name": "b"}, {"name": "a"}]));
        let start = Instant::now();
        session.on_ready(start);

        let reload_at = start + Duration::from_millis(100);
        session.reload(reload_at);

        assert_eq!(session.poll(start + SORT_SETTLE_DELAY), None);
        assert_eq!(
            session.poll(reload_at + SORT_SETTLE_DELAY),
            Some(CommandOutcome::Done)
        );
    }

    #[test]
    fn test_default_sort_on_unknown_column_is_collected() {
        let config = GridConfig {
            default_sort_column: "missing".to_string(),
            ..GridConfig::default()
        };
        let mut session = mounted(config, json!([{"name": "a"}]));
        let start = Instant::now();
        session.on_ready(start);

        let outcome = session.poll(start + SORT_SETTLE_DELAY);

        assert_eq!(
            outcome,
            Some(CommandOutcome::Skipped(WidgetCommandError::UnknownColumn("missing".to_string())))
        );
        assert!(session.outputs().notices().is_empty());
        assert_eq!(session.diagnostics().errors_of_kind(ErrorKind::Grid).len(), 1);
    }

    #[test]
    fn test_edits_follow_rows_after_resort() {
        let mut session = mounted(
            editing_config(),
            json!([{"name": "a", "n": 1}, {"name": "b", "n": 2}, {"name": "c", "n": 3}]),
        );
        grid(&mut session)
            .apply_column_state(&[ColumnSortState {
                col_id: "n".to_string(),
                sort: Some(SortDirection::Desc),
                sort_index: None,
            }])
            .unwrap();

        // Rows without ids are keyed by load position, not display position
        edit(&mut session, "row-0", "name", json!("A"));

        assert_eq!(
            session.outputs().changed_rows(),
            rows(json!([{"name": "A", "n": 1}])).as_slice()
        );
        assert_eq!(session.outputs().edited_data()[0]["name"], json!("A"));
    }

    #[test]
    fn test_editing_id_cell_keeps_row_identity() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));

        edit(&mut session, "1", "id", json!(99));

        assert_eq!(session.state(), SessionState::Dirty);
        assert!(session.edits().is_changed(&RowId::new("1")));
        assert_eq!(session.stats().edited_count, 1);
        assert_eq!(
            session.outputs().changed_rows(),
            rows(json!([{"id": 99, "name": "a"}])).as_slice()
        );
        assert_eq!(session.snapshot().rows[0].data["id"], json!(99));
        assert!(!session.diagnostics().has_errors());
    }

    #[test]
    fn test_editing_id_cell_to_another_rows_id() {
        let mut session = mounted(editing_config(), json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));

        edit(&mut session, "1", "id", json!(2));

        assert!(session.edits().is_changed(&RowId::new("1")));
        assert!(!session.edits().is_changed(&RowId::new("2")));
        assert_eq!(
            session.outputs().changed_rows(),
            rows(json!([{"id": 2, "name": "a"}])).as_slice()
        );
        assert_eq!(session.snapshot().rows[0].data["id"], json!(2));
        assert_eq!(session.snapshot().rows[1].data["name"], json!("b"));
    }

    #[test]
    fn test_edit_from_host_without_widget() {
        let mut session = Session::new(editing_config(), RecordedOutputs::new());
        session.set_input(GridInput::rows(json!([{"id": 1, "v": 1}, {"id": 2, "v": 2}])));

        session.on_cell_value_changed(CellValueChanged {
            node: GridNode {
                data: row(json!({"id": 2, "v": 20})),
                source_index: Some(1),
                displayed_index: None,
            },
            field: "v".to_string(),
            old_value: json!(2),
            new_value: json!(20),
        });

        assert_eq!(session.outputs().changed_rows(), rows(json!([{"id": 2, "v": 20}])).as_slice());
        assert_eq!(session.stats().edited_count, 1);
    }

    #[test]
    fn test_edit_for_unknown_row_is_ignored() {
        let mut session = mounted(editing_config(), json!([{"id": 1}]));
        session.on_cell_value_changed(CellValueChanged {
            node: GridNode {
                data: row(json!({"id": 99})),
                source_index: None,
                displayed_index: None,
            },
            field: "id".to_string(),
            old_value: Value::Null,
            new_value: json!(99),
        });

        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.edits().is_empty());
        assert!(session.diagnostics().has_errors());
    }

    #[test]
    fn test_mount_pushes_current_dataset() {
        let mut session = Session::new(GridConfig::default(), RecordedOutputs::new());
        session.set_input(GridInput::rows(json!([{"id": 1}, {"id": 2}])));
        session.mount(HeadlessGrid::new());
        session.on_ready(Instant::now());

        assert_eq!(session.stats().total_rows, 2);
        assert!(session.unmount().is_some());
        assert!(session.widget().is_none());
    }

    #[test]
    fn test_filter_changes_refresh_stats() {
        let mut session = mounted(GridConfig::default(), json!([{"name": "apple"}, {"name": "pear"}]));
        grid(&mut session).set_quick_filter(Some("app".to_string()));
        session.on_filter_changed();
        assert_eq!(session.stats().total_rows, 1);

        assert!(session.clear_filters().is_done());
        assert_eq!(session.stats().total_rows, 2);
    }

    #[test]
    fn test_widget_options() {
        let config = GridConfig {
            enable_editing: true,
            enable_pagination: true,
            page_size: 0,
            multi_row_selection: false,
            ..GridConfig::default()
        };
        let session = mounted(config, json!([{"id": 1, "name": "a"}]));
        let options = session.widget_options();

        assert!(options.default_col_def.editable);
        assert_eq!(options.default_col_def.min_width, 100);
        assert_eq!(options.row_selection, Some(SelectionMode::SingleRow));
        assert!(!options.header_checkbox);
        assert!(options.pagination);
        assert_eq!(options.page_size, 1);
        assert_eq!(options.column_defs.field_names(), vec!["id", "name"]);

        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["defaultColDef"]["flex"], json!(1));
        assert_eq!(value["rowSelection"], json!("singleRow"));
        assert_eq!(value["columnDefs"][1]["headerName"], json!("Name"));
    }

    #[test]
    fn test_input_from_json() {
        let input = GridInput::from_json(r#"{"rowData": [{"id": 1}], "columnDefs": null}"#).unwrap();
        assert_eq!(input.row_data, json!([{"id": 1}]));
        assert!(input.column_defs.is_empty());
        assert_eq!(input.alternative_data, Value::Null);
    }
}
