//! SQLite backend for query-gate.
//!
//! Provides the `SqliteConnector` that opens pooled connections with sqlx,
//! conversion of result rows to text, and the catalog lookups used by the
//! schema inspector.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteRow};
use sqlx::{Column as _, ConnectOptions, Row as _, TypeInfo, ValueRef};
use tracing::debug;

use crate::db::{ColumnDescriptor, ResultSet, Row};
use crate::error::{GateError, Result};
use crate::pool::{Connector, PoolError};

/// How long a connection waits on a locked database file before failing.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Virtual machine steps between two checks of a statement deadline.
const DEADLINE_CHECK_OPS: i32 = 1_000;

/// Opens connections to one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    options: SqliteConnectOptions,
}

impl SqliteConnector {
    /// Creates a connector for the database at `path`.
    ///
    /// Read-only connectors never create the file; the database has to be
    /// loaded first.
    pub fn new(path: impl Into<PathBuf>, read_only: bool) -> Self {
        let path = path.into();
        let mut options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(read_only)
            .create_if_missing(!read_only)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));
        if !read_only {
            // A single self-contained file, so it can be renamed into place.
            options = options.journal_mode(SqliteJournalMode::Delete);
        }
        Self { path, options }
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    async fn connect(&self) -> std::result::Result<SqliteConnection, PoolError> {
        debug!("Opening SQLite connection to {}", self.path.display());
        self.options
            .connect()
            .await
            .map_err(|e| PoolError::Connect(format!("{}: {e}", self.path.display())))
    }
}

/// Converts fetched rows into a [`ResultSet`].
///
/// Column names come from the first row, so a query that matches nothing
/// yields an empty column list.
pub fn to_result_set(rows: &[SqliteRow]) -> Result<ResultSet> {
    let columns = rows
        .first()
        .map(|first| {
            first
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let rows = rows.iter().map(convert_row).collect::<Result<Vec<_>>>()?;
    Ok(ResultSet::with_data(columns, rows))
}

/// Runs `sql` and collects every row, aborting it inside SQLite once `budget`
/// has elapsed.
///
/// The deadline is checked by a progress handler on the connection's worker
/// thread, so when this returns the statement has stopped running. A timed-out
/// statement surfaces as [`GateError::Timeout`].
pub async fn fetch_all_within(
    conn: &mut SqliteConnection,
    sql: &str,
    budget: Duration,
) -> Result<Vec<SqliteRow>> {
    let deadline = Instant::now() + budget;
    {
        let mut handle = conn
            .lock_handle()
            .await
            .map_err(|e| GateError::database(format_query_error(&e)))?;
        handle.set_progress_handler(DEADLINE_CHECK_OPS, move || Instant::now() < deadline);
    }

    // Not prepared-and-cached: every statement is ad hoc.
    let fetched = sqlx::query(sql)
        .persistent(false)
        .fetch_all(&mut *conn)
        .await;

    let cleared = conn
        .lock_handle()
        .await
        .map(|mut handle| handle.remove_progress_handler());

    let rows = fetched.map_err(|e| {
        if is_interrupted(&e) {
            GateError::Timeout(budget)
        } else {
            GateError::database(format_query_error(&e))
        }
    })?;
    cleared.map_err(|e| GateError::database(format_query_error(&e)))?;
    Ok(rows)
}

/// True for SQLITE_INTERRUPT, raised when the progress handler gives up.
fn is_interrupted(error: &sqlx::Error) -> bool {
    error.as_database_error().is_some_and(|db_error| {
        db_error.code().as_deref() == Some("9") || db_error.message() == "interrupted"
    })
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Result<Row> {
    row.columns()
        .iter()
        .map(|col| Ok((col.name().to_string(), convert_value(row, col.ordinal())?)))
        .collect()
}

/// Renders a single cell as text, keeping NULL distinct.
///
/// Dispatches on the storage class of the value itself, since SQLite
/// columns are not bound to one type.
fn convert_value(row: &SqliteRow, index: usize) -> Result<Option<String>> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| GateError::database(e.to_string()))?;
    if raw.is_null() {
        return Ok(None);
    }
    let storage_class = raw.type_info().name().to_uppercase();

    let text = match storage_class.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(|v| v.to_string()),
        // Debug formatting is the shortest text that round-trips.
        "REAL" => row.try_get::<f64, _>(index).map(|v| format!("{v:?}")),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(|v| STANDARD.encode(v)),
        _ => row.try_get::<String, _>(index),
    }
    .map_err(|e| GateError::database(e.to_string()))?;

    Ok(Some(text))
}

/// Lists user tables, sorted by name.
pub async fn fetch_table_names(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| GateError::database(format_query_error(&e)))
}

/// Looks up a user table the way SQLite resolves names in queries (ignoring
/// ASCII case) and returns the name as it was declared.
pub async fn resolve_table_name(
    conn: &mut SqliteConnection,
    table_name: &str,
) -> Result<Option<String>> {
    sqlx::query_scalar(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name = ?1 COLLATE NOCASE
        "#,
    )
    .bind(table_name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| GateError::database(format_query_error(&e)))
}

/// Fetches columns for a specific table, without primary key information.
pub async fn fetch_columns(
    conn: &mut SqliteConnection,
    table_name: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        r#"
        SELECT name, type, "notnull"
        FROM pragma_table_info(?1)
        ORDER BY cid
        "#,
    )
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        GateError::database(format!(
            "failed to fetch columns for {table_name}: {}",
            format_query_error(&e)
        ))
    })?;

    Ok(rows
        .into_iter()
        .map(|(name, declared_type, not_null)| ColumnDescriptor {
            name,
            declared_type,
            nullable: not_null == 0,
            is_primary_key: false,
        })
        .collect())
}

/// Fetches primary key columns for a specific table, in key order.
pub async fn fetch_primary_key(
    conn: &mut SqliteConnection,
    table_name: &str,
) -> Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT name
        FROM pragma_table_info(?1)
        WHERE pk > 0
        ORDER BY pk
        "#,
    )
    .bind(table_name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        GateError::database(format!(
            "failed to fetch primary key for {table_name}: {}",
            format_query_error(&e)
        ))
    })
}

/// Extracts the engine's own message from a sqlx error.
pub fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
