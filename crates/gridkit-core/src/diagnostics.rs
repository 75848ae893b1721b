//! Error collection and re-delivery loop detection
//!
//! One `Diagnostics` value is created per session and shared by `Rc`, so
//! every collaborator reports into the same history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use tracing::{error, warn};

/// Errors kept by the collector
pub const MAX_ERRORS: usize = 50;

/// Consecutive redundant deliveries that flag a possible render loop
pub const LOOP_THRESHOLD: usize = 10;

/// Area an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Data,
    Grid,
    Selection,
    Rendering,
    Unknown,
}

/// A collected error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// When the error was collected
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub message: String,
    /// Extra structured detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Counts redundant deliveries per key
#[derive(Debug, Default)]
pub struct LoopDetector {
    counts: HashMap<String, usize>,
    threshold: usize,
}

impl LoopDetector {
    pub fn new() -> Self {
        Self::with_threshold(LOOP_THRESHOLD)
    }

    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            counts: HashMap::new(),
            threshold: threshold.max(1),
        }
    }

    /// Count a delivery that changed nothing
    ///
    /// Returns true exactly once per run, when the count reaches the threshold.
    pub fn record_redundant(&mut self, key: &str) -> bool {
        let count = self.counts.entry(key.to_string()).or_default();
        *count += 1;
        if *count == self.threshold {
            warn!(
                key,
                count = *count,
                "possible render loop: input re-delivered without changes"
            );
            return true;
        }
        false
    }

    /// A delivery that changed something ends the run
    pub fn record_distinct(&mut self, key: &str) {
        self.counts.remove(key);
    }

    /// Current run length for a key
    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Shared error history and loop detector
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: RefCell<VecDeque<ErrorRecord>>,
    loops: RefCell<LoopDetector>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            errors: RefCell::new(VecDeque::with_capacity(MAX_ERRORS)),
            loops: RefCell::new(LoopDetector::new()),
        }
    }

    /// Collect an error, dropping the oldest beyond `MAX_ERRORS`
    pub fn record_error(&self, kind: ErrorKind, message: impl Into<String>, context: Option<Value>) {
        let record = ErrorRecord {
            timestamp: Utc::now(),
            kind,
            message: message.into(),
            context,
        };
        error!(kind = ?record.kind, "{}", record.message);

        let mut errors = self.errors.borrow_mut();
        errors.push_front(record);
        errors.truncate(MAX_ERRORS);
    }

    /// Collected errors, newest first
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.errors.borrow().iter().cloned().collect()
    }

    pub fn errors_of_kind(&self, kind: ErrorKind) -> Vec<ErrorRecord> {
        self.errors
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.errors.borrow().front().cloned()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub fn clear_errors(&self) {
        self.errors.borrow_mut().clear();
    }

    /// See [`LoopDetector::record_redundant`]
    pub fn record_redundant(&self, key: &str) -> bool {
        self.loops.borrow_mut().record_redundant(key)
    }

    pub fn record_distinct(&self, key: &str) {
        self.loops.borrow_mut().record_distinct(key);
    }

    pub fn redundant_count(&self, key: &str) -> usize {
        self.loops.borrow().count(key)
    }
}
