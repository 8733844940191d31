//! Database layer for query-gate.
//!
//! Wraps the SQLite backend behind the generic connection pool and defines
//! the text-only result and schema types the rest of the crate passes around.

mod schema;
mod sqlite;
mod types;

pub use schema::{ColumnDescriptor, TableSchema};
pub use sqlite::{
    fetch_all_within, fetch_columns, fetch_primary_key, fetch_table_names, format_query_error,
    resolve_table_name, to_result_set, SqliteConnector,
};
pub use types::{ResultSet, Row};

use std::path::Path;

use tracing::info;

use crate::config::PoolConfig;
use crate::pool::ConnectionPool;

/// The pool type shared by the executor, the schema inspector and the loader.
pub type DbPool = ConnectionPool<SqliteConnector>;

/// Builds a read-only pool for the database at `path`.
///
/// No connection is opened here; the first `acquire` does that, so the
/// database file may still be missing when the pool is created.
pub fn open_pool(path: &Path, config: &PoolConfig) -> DbPool {
    info!(
        "Creating pool for {} (max {} connections)",
        path.display(),
        config.max_connections()
    );
    ConnectionPool::new(SqliteConnector::new(path, true), config.pool_options())
}
