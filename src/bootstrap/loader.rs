//! The loader that swaps in a freshly built database file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sqlx::Connection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::{fetch_table_names, format_query_error, DbPool, SqliteConnector};
use crate::error::{GateError, Result};
use crate::pool::Connector;

/// What a successful load produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// User tables in the new database, sorted by name.
    pub tables: Vec<String>,
}

/// Rebuilds the database file behind a pool from SQL scripts.
pub struct DatabaseLoader {
    path: PathBuf,
    pool: Arc<DbPool>,
    // One load at a time; the last rename wins otherwise.
    lock: Mutex<()>,
}

impl DatabaseLoader {
    /// Creates a loader for the database at `path`, served by `pool`.
    pub fn new(path: impl Into<PathBuf>, pool: Arc<DbPool>) -> Self {
        Self {
            path: path.into(),
            pool,
            lock: Mutex::new(()),
        }
    }

    /// Returns the path of the database this loader replaces.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `script` against a fresh database and swaps it in.
    ///
    /// The script runs against a temporary file in the same directory as the
    /// live database. On any error the temporary file is removed and the live
    /// database is left as it was. On success the file is renamed over the
    /// live one and the pool is invalidated so no connection keeps serving
    /// the old contents.
    pub async fn load_script(&self, script: &str) -> Result<LoadSummary> {
        if script.trim().is_empty() {
            return Err(GateError::validation("no SQL script provided"));
        }

        let _guard = self.lock.lock().await;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".query-gate-load-")
            .suffix(".db")
            .tempfile_in(&dir)
            .map_err(|e| GateError::load(format!("cannot create staging file: {e}")))?;

        let mut conn = SqliteConnector::new(staging.path(), false)
            .connect()
            .await
            .map_err(|e| GateError::load(e.to_string()))?;

        let outcome = match sqlx::Executor::execute(&mut conn, sqlx::raw_sql(script)).await {
            Ok(_) => fetch_table_names(&mut conn).await,
            Err(e) => Err(GateError::load(format_query_error(&e))),
        };
        // Close before the rename so everything is flushed to the staging file.
        let closed = conn.close().await;

        let tables = match outcome {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Script failed, keeping {}: {}", self.path.display(), e);
                return Err(match e {
                    GateError::Load(_) => e,
                    other => GateError::load(other.to_string()),
                });
            }
        };
        closed.map_err(|e| GateError::load(format_query_error(&e)))?;

        staging
            .persist(&self.path)
            .map_err(|e| GateError::load(format!("cannot replace database file: {}", e.error)))?;
        self.pool.invalidate();

        info!(
            "Loaded {} with {} tables: {}",
            self.path.display(),
            tables.len(),
            tables.join(", ")
        );
        Ok(LoadSummary { tables })
    }

    /// Reads a script from disk and loads it.
    ///
    /// Files without a `.sql` extension are refused unless `force` is set.
    pub async fn load_file(&self, script_path: &Path, force: bool) -> Result<LoadSummary> {
        if !force {
            check_script_name(&script_path.to_string_lossy())?;
        }

        let script = tokio::fs::read_to_string(script_path).await.map_err(|e| {
            GateError::load(format!("cannot read {}: {e}", script_path.display()))
        })?;
        self.load_script(&script).await
    }
}

/// Validates a script's file name and returns its bare file name.
///
/// Directory components are stripped, so the name is safe to echo back.
pub fn check_script_name(filename: &str) -> Result<String> {
    let name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.is_empty() {
        return Err(GateError::validation("no file name provided"));
    }
    if !name.to_ascii_lowercase().ends_with(".sql") {
        return Err(GateError::validation("file must be a .sql file"));
    }
    Ok(name)
}
