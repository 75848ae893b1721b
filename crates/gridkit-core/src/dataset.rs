//! The loaded dataset: rows with identities plus the column set

use crate::columns::ColumnSet;
use crate::error::NormalizationError;
use crate::normalize::normalize;
use crate::row::{GridRow, Row, RowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Rows and columns as last loaded, with cell edits applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Loaded rows in canonical order
    pub rows: Vec<GridRow>,
    /// Columns handed to the grid
    pub columns: ColumnSet,
    /// Incremented on every load
    pub generation: u64,
}

impl DatasetSnapshot {
    /// Normalize `source` and build the snapshot for load number `generation`
    pub fn load(
        source: &Value,
        column_defs: &[Value],
        editing_enabled: bool,
        generation: u64,
    ) -> Result<Self, NormalizationError> {
        let rows = normalize(source)?;
        Ok(Self::from_rows(rows, column_defs, editing_enabled, generation))
    }

    /// Build a snapshot from already-normalized rows
    pub fn from_rows(rows: Vec<Row>, column_defs: &[Value], editing_enabled: bool, generation: u64) -> Self {
        let columns = ColumnSet::resolve(column_defs, &rows, editing_enabled);
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(position, data)| GridRow::new(data, position))
            .collect();

        Self {
            rows,
            columns,
            generation,
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first row with this identity
    pub fn position_of(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|r| &r.id == id)
    }

    /// Set one cell of the row at `position`. Returns false when out of range.
    pub fn apply_edit(&mut self, position: usize, field: &str, value: Value) -> bool {
        match self.rows.get_mut(position) {
            Some(row) => {
                row.data.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Identities shared by more than one row, in first-seen order
    pub fn duplicate_ids(&self) -> Vec<RowId> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();

        for row in &self.rows {
            if !seen.insert(&row.id) && reported.insert(&row.id) {
                duplicates.push(row.id.clone());
            }
        }
        duplicates
    }

    /// Row data in canonical order
    pub fn rows_data(&self) -> Vec<Row> {
        self.rows.iter().map(|r| r.data.clone()).collect()
    }
}
