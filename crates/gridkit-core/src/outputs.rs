//! Output channels exposed to the host
//!
//! The session publishes three row views (all rows with edits, selected
//! rows, changed rows) and user-facing notices through `OutputChannels`.

use crate::row::Row;
use serde::{Deserialize, Serialize};

/// Severity of a notice shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Where the session publishes its views
pub trait OutputChannels {
    /// Rows currently selected in the grid
    fn set_selected_rows(&mut self, rows: Vec<Row>);

    /// Every row, edits included
    fn set_edited_data(&mut self, rows: Vec<Row>);

    /// Rows edited since the last load
    fn set_changed_rows(&mut self, rows: Vec<Row>);

    fn show_notice(&mut self, notice: Notice);
}

/// The three row views
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputViews {
    pub selected_rows: Vec<Row>,
    pub edited_data: Vec<Row>,
    pub changed_rows: Vec<Row>,
}

/// How many times each channel was written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCounts {
    pub selected_rows: usize,
    pub edited_data: usize,
    pub changed_rows: usize,
}

/// In-memory output channels that keep the latest value of each view
#[derive(Debug, Clone, Default)]
pub struct RecordedOutputs {
    views: OutputViews,
    counts: UpdateCounts,
    notices: Vec<Notice>,
}

impl RecordedOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> &OutputViews {
        &self.views
    }

    pub fn selected_rows(&self) -> &[Row] {
        &self.views.selected_rows
    }

    pub fn edited_data(&self) -> &[Row] {
        &self.views.edited_data
    }

    pub fn changed_rows(&self) -> &[Row] {
        &self.views.changed_rows
    }

    pub fn update_counts(&self) -> UpdateCounts {
        self.counts
    }

    /// Notices not yet drained
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Drain pending notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

impl OutputChannels for RecordedOutputs {
    fn set_selected_rows(&mut self, rows: Vec<Row>) {
        self.views.selected_rows = rows;
        self.counts.selected_rows += 1;
    }

    fn set_edited_data(&mut self, rows: Vec<Row>) {
        self.views.edited_data = rows;
        self.counts.edited_data += 1;
    }

    fn set_changed_rows(&mut self, rows: Vec<Row>) {
        self.views.changed_rows = rows;
        self.counts.changed_rows += 1;
    }

    fn show_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
