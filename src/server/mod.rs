//! HTTP interface for query-gate.
//!
//! Exposes the executor, the schema inspector and the loader as JSON
//! endpoints. All handlers share one pool through [`AppState`].

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{ExecuteRequest, TablesResponse, UploadResponse};

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bootstrap::DatabaseLoader;
use crate::config::{PoolConfig, ServerConfig};
use crate::db::DbPool;
use crate::error::{GateError, Result};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: Arc<DbPool>,
    loader: DatabaseLoader,
    query_timeout: Duration,
    allow_upload: bool,
}

impl AppState {
    /// Creates the state from an already constructed pool and loader.
    pub fn new(
        pool: Arc<DbPool>,
        loader: DatabaseLoader,
        pool_config: &PoolConfig,
        server_config: &ServerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                loader,
                query_timeout: pool_config.query_timeout(),
                allow_upload: server_config.allow_upload,
            }),
        }
    }

    /// The shared connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.inner.pool
    }

    /// The loader behind `POST /upload_sql`.
    pub fn loader(&self) -> &DatabaseLoader {
        &self.inner.loader
    }

    /// Per-statement budget for `POST /execute_query`.
    pub fn query_timeout(&self) -> Duration {
        self.inner.query_timeout
    }

    /// Whether uploads may replace the database.
    pub fn allow_upload(&self) -> bool {
        self.inner.allow_upload
    }
}

/// Builds the router. Request bodies above `max_body_bytes` are refused.
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/execute_query", post(handlers::execute_query))
        .route("/list_tables", get(handlers::list_tables))
        .route("/table_schema/{name}", get(handlers::table_schema))
        .route("/upload_sql", post(handlers::upload_sql))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves requests on the configured address until `shutdown` is cancelled,
/// then closes the pool.
pub async fn serve(
    state: AppState,
    config: &ServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let listen = config.listen();
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| GateError::internal(format!("Failed to bind to {listen}: {e}")))?;
    info!(
        address = %listen,
        uploads = config.allow_upload,
        "query-gate listening"
    );

    let app = create_router(state.clone(), config.max_upload_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| GateError::internal(format!("Server error: {e}")))?;

    state.pool().close();
    info!("Server stopped, connection pool closed");
    Ok(())
}
