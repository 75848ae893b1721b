//! gridkit-core: Data reconciliation layer for an interactive data grid
//!
//! This library provides functionality to:
//! - Normalize loosely shaped JSON input into canonical row objects
//! - Assign stable identities to rows that may lack an id
//! - Infer column kinds and their formatting, parsing and rendering rules
//! - Track which rows were edited since the last load
//! - Keep the host's output views (all rows, selected rows, changed rows)
//!   consistent with the grid widget through a session state machine

pub mod columns;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod edits;
pub mod error;
pub mod format;
pub mod headless;
pub mod identity;
pub mod normalize;
pub mod outputs;
pub mod row;
pub mod session;
pub mod widget;

pub use columns::{infer_schema, CellContent, ColumnKind, ColumnSchema, ColumnSet, DefaultColumnDef};
pub use config::{GridConfig, SelectionMode, SortDirection, SortSpec};
pub use dataset::DatasetSnapshot;
pub use diagnostics::{Diagnostics, ErrorKind, ErrorRecord, LoopDetector};
pub use edits::EditTracker;
pub use error::{Error, NormalizationError, Result, WidgetCommandError};
pub use headless::HeadlessGrid;
pub use identity::resolve_id;
pub use normalize::{normalize, select_source, DataDiagnostic};
pub use outputs::{Notice, NoticeLevel, OutputChannels, OutputViews, RecordedOutputs};
pub use row::{GridNode, GridRow, Row, RowId};
pub use session::{CommandOutcome, GridInput, GridSession, GridStats, SessionState, WidgetOptions};
pub use widget::{
    CellValueChanged, ColumnSortState, CsvExportParams, GridWidget, SelectionChanged,
    SelectionSource, WidgetCommand,
};
