//! Error types for gridkit-core

use serde_json::Value;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gridkit-core
#[derive(Debug, Error)]
pub enum Error {
    /// Incoming data could not be turned into rows
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// A command sent to the grid widget could not run
    #[error(transparent)]
    WidgetCommand(#[from] WidgetCommandError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why an input value could not be normalized into a row sequence
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizationError {
    /// The value is neither an array, a wrapper object, nor a row object
    #[error("invalid data format: expected an array of objects, got {shape}")]
    UnsupportedShape { shape: String },

    /// The unwrapped sequence has no rows
    #[error("no data available")]
    EmptyDataset,

    /// Some elements are not objects. The sequence is kept for display.
    #[error("found {invalid} invalid rows that are not objects")]
    InvalidRowType { invalid: usize, rows: Vec<Value> },
}

/// Failures of pass-through commands sent to the grid widget
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetCommandError {
    /// No widget is mounted yet (or it was unmounted)
    #[error("grid is not ready")]
    NotMounted,

    /// A column-state change targeted a column the grid does not have
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),

    /// Export of the selection was requested with nothing selected
    #[error("no rows selected")]
    EmptySelection,

    /// Any other failure reported by the widget
    #[error("grid rejected the command: {0}")]
    Widget(String),
}

/// A row could not be serialized while deriving its identity
#[derive(Debug, Error)]
#[error("failed to serialize row: {0}")]
pub struct SerializationError(#[from] serde_json::Error);
