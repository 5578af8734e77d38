//! Schema Description
//!
//! The schema handed to the generator is opaque text. This module only knows
//! how to render table metadata into that text; nothing downstream parses it.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque schema text, immutable for the lifetime of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescription(String);

impl SchemaDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Renders tables as
    ///
    /// ```text
    /// Table: users
    ///   - id (INT) PRIMARY KEY
    ///   - name (VARCHAR(255))
    /// ```
    pub fn from_tables(tables: &[TableSchema]) -> Self {
        let blocks: Vec<String> = tables.iter().map(TableSchema::render).collect();
        Self(blocks.join("\n\n"))
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SchemaDescription {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for SchemaDescription {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    fn render(&self) -> String {
        let mut lines = vec![format!("Table: {}", self.name)];
        for column in &self.columns {
            let mut line = format!("  - {} ({})", column.name, column.data_type);
            if column.primary_key {
                line.push_str(" PRIMARY KEY");
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// Anything that can snapshot the database schema for a request.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn describe_schema(&self) -> Result<SchemaDescription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_tables_in_prompt_format() {
        let tables = vec![
            TableSchema {
                name: "users".to_string(),
                columns: vec![
                    ColumnSchema { name: "id".to_string(), data_type: "INT".to_string(), primary_key: true },
                    ColumnSchema { name: "name".to_string(), data_type: "VARCHAR(255)".to_string(), primary_key: false },
                ],
            },
            TableSchema { name: "books".to_string(), columns: vec![] },
        ];

        let schema = SchemaDescription::from_tables(&tables);
        assert_eq!(
            schema.as_str(),
            "Table: users\n  - id (INT) PRIMARY KEY\n  - name (VARCHAR(255))\n\nTable: books"
        );
    }

    #[test]
    fn test_empty_schema() {
        assert!(SchemaDescription::from_tables(&[]).is_empty());
        assert!(!SchemaDescription::from("Table: t").is_empty());
    }
}
