//! Gated query execution.
//!
//! Runs one read-only statement on a pooled connection: classification
//! first, then an execution SQLite itself aborts at the deadline, then the
//! connection goes back to the pool or is thrown away depending on how the
//! statement ended.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::db::{fetch_all_within, to_result_set, DbPool, ResultSet};
use crate::error::{GateError, Result};
use crate::safety::classify_sql;

/// Default budget for a single statement.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes classified read queries against the shared pool.
pub struct QueryExecutor<'a> {
    pool: &'a DbPool,
    query_timeout: Duration,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor with the default query timeout.
    pub fn new(pool: &'a DbPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Sets how long a single statement may run.
    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// Classifies and runs `sql`, returning every row as text.
    ///
    /// Rejected queries never touch the pool. A connection that saw any
    /// error, including the timeout, is discarded rather than reused.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(GateError::EmptyQuery);
        }

        if let Err(reason) = classify_sql(sql).into_result() {
            warn!("Rejected query ({}): {}", reason, truncate_for_log(sql));
            return Err(GateError::Rejected(reason));
        }

        let mut conn = self.pool.acquire().await?;
        let start = Instant::now();

        // The task owns the connection, so the slot stays held until SQLite
        // has stopped the statement even if this caller goes away.
        let statement = sql.to_owned();
        let budget = self.query_timeout;
        let task = tokio::spawn(async move {
            let outcome = fetch_all_within(&mut *conn, &statement, budget)
                .await
                .and_then(|rows| to_result_set(&rows));
            conn.settle(outcome)
        });

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(GateError::internal(format!("query task failed: {e}"))),
        };
        match &outcome {
            Ok(result) => debug!(
                "Query returned {} rows in {:?}",
                result.count,
                start.elapsed()
            ),
            Err(e) => warn!("Query failed after {:?}: {}", start.elapsed(), e),
        }
        outcome
    }
}

/// Shortens a statement for log output.
fn truncate_for_log(sql: &str) -> String {
    const MAX_CHARS: usize = 120;
    match sql.char_indices().nth(MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}
