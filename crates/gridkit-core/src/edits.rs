//! Edit tracking
//!
//! Tracks the identities of rows mutated since the last load or reload. The
//! set only grows until it is reset; changed rows are always recomputed from
//! the authoritative row collection, never cached per edit.

use crate::row::RowId;
use std::collections::HashSet;
use tracing::debug;

/// Set of row identities edited since the last load
#[derive(Debug, Clone, Default)]
pub struct EditTracker {
    changed: HashSet<RowId>,
}

impl EditTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a row as changed. Returns `true` the first time a row is recorded.
    pub fn record_edit(&mut self, id: RowId) -> bool {
        let added = self.changed.insert(id);
        if added {
            debug!(changed = self.changed.len(), "row marked as changed");
        }
        added
    }

    /// Forget every tracked identity
    pub fn reset(&mut self) {
        self.changed.clear();
    }

    /// Whether a row has been edited
    pub fn is_changed(&self, id: &RowId) -> bool {
        self.changed.contains(id)
    }

    /// Number of edited rows
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Filter `all_rows` down to the rows whose identity has been edited
    pub fn snapshot_changed<T, F>(&self, all_rows: &[T], id_of: F) -> Vec<T>
    where
        T: Clone,
        F: Fn(&T) -> RowId,
    {
        if self.changed.is_empty() {
            return Vec::new();
        }
        all_rows
            .iter()
            .filter(|row| self.changed.contains(&id_of(*row)))
            .cloned()
            .collect()
    }
}
