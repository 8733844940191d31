//! Table listing and column description over pooled connections.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::sqlite::SqliteConnection;
use tracing::debug;

use crate::db::{
    fetch_columns, fetch_primary_key, fetch_table_names, resolve_table_name, DbPool, TableSchema,
};
use crate::error::{GateError, Result};

static TABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table name pattern is valid")
});

/// Returns true if `name` is a plain identifier (letters, digits, underscores,
/// not starting with a digit).
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

/// Reads the catalog of the served database through the shared pool.
pub struct SchemaInspector<'a> {
    pool: &'a DbPool,
}

impl<'a> SchemaInspector<'a> {
    /// Creates an inspector borrowing `pool`.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Lists user tables, sorted by name.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        let tables = fetch_table_names(&mut conn).await;
        conn.settle(tables)
    }

    /// Describes the columns of `table` in declaration order.
    ///
    /// Names that are not plain identifiers are refused without touching the
    /// database. A table that does not exist is a database error, the same
    /// way a query against it would be. Names match case-insensitively, as in
    /// SQL, and the schema carries the name as declared.
    pub async fn get_schema(&self, table: &str) -> Result<TableSchema> {
        if !is_valid_table_name(table) {
            return Err(GateError::validation(format!("invalid table name: {table}")));
        }

        let mut conn = self.pool.acquire().await?;
        let schema = describe(&mut conn, table).await;
        conn.settle(schema)
    }
}

async fn describe(conn: &mut SqliteConnection, requested: &str) -> Result<TableSchema> {
    let Some(table) = resolve_table_name(conn, requested).await? else {
        return Err(GateError::database(format!("no such table: {requested}")));
    };

    let mut columns = fetch_columns(conn, &table).await?;
    let primary_key = fetch_primary_key(conn, &table).await?;
    for column in &mut columns {
        column.is_primary_key = primary_key.contains(&column.name);
    }

    debug!(
        "Described table {} ({} columns, primary key {:?})",
        table,
        columns.len(),
        primary_key
    );
    Ok(TableSchema {
        name: table,
        columns,
    })
}
