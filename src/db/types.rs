//! Query result types for query-gate.
//!
//! Every cell is carried as text so results are transport safe no matter
//! which storage class produced them; SQL NULL stays `None`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The rows returned by one query, in projection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSet {
    /// Column names, in the order the query projected them.
    pub columns: Vec<String>,

    /// Rows of data.
    pub rows: Vec<Row>,

    /// Number of rows in `rows`.
    pub count: usize,
}

impl ResultSet {
    /// Creates an empty result set (no columns, no rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result set with the given columns and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self {
            columns,
            rows,
            count,
        }
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row: column name to nullable text value, in projection order.
///
/// Serializes as a JSON object. When a query projects the same name twice
/// the later value wins, matching how a JSON object would read it anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, Option<String>)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a column, replacing an earlier cell with the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Looks up a cell. The outer `Option` is the column, the inner one is NULL.
    pub fn get(&self, column: &str) -> Option<Option<&str>> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_deref())
    }

    /// Iterates over the cells in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
