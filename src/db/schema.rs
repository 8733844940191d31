//! Table schema types for query-gate.
//!
//! Field names serialize to the keys the HTTP interface promises
//! (`table`, `schema`, `column`, `type`, `nullable`, `primary_key`).

use serde::Serialize;

/// Describes one table and its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name.
    #[serde(rename = "table")]
    pub name: String,

    /// Columns in declaration order.
    #[serde(rename = "schema")]
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the names of the primary key columns, in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Metadata for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name.
    #[serde(rename = "column")]
    pub name: String,

    /// Type as written in the table definition (may be empty in SQLite).
    #[serde(rename = "type")]
    pub declared_type: String,

    /// Whether the column accepts NULL.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    #[serde(rename = "primary_key")]
    pub is_primary_key: bool,
}
