//! Query Result - rows returned by an executor

use serde::{Deserialize, Serialize};

/// One row as column name → JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Rows returned by a successful query, with the column order the engine reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
