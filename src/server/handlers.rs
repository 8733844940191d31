//! Request handlers for the gateway endpoints.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::bootstrap::check_script_name;
use crate::catalog::SchemaInspector;
use crate::db::{ResultSet, TableSchema};
use crate::error::GateError;
use crate::query::QueryExecutor;

/// Body of `POST /execute_query`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub query: String,
}

/// Response of `GET /list_tables`.
#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Query string of `POST /upload_sql`.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub filename: String,
}

/// Response of `POST /upload_sql`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub tables: Vec<String>,
}

pub async fn execute_query(
    State(state): State<AppState>,
    request: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ResultSet>, ApiError> {
    let Json(request) = request?;
    let result = QueryExecutor::new(state.pool())
        .with_timeout(state.query_timeout())
        .execute(&request.query)
        .await?;
    Ok(Json(result))
}

pub async fn list_tables(State(state): State<AppState>) -> Result<Json<TablesResponse>, ApiError> {
    let tables = SchemaInspector::new(state.pool()).list_tables().await?;
    Ok(Json(TablesResponse { tables }))
}

pub async fn table_schema(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<TableSchema>, ApiError> {
    let schema = SchemaInspector::new(state.pool()).get_schema(&table).await?;
    Ok(Json(schema))
}

/// Replaces the database with the script in the request body.
pub async fn upload_sql(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if !state.allow_upload() {
        return Err(ApiError::UploadsDisabled);
    }

    let filename = check_script_name(&params.filename)?;
    let script = std::str::from_utf8(&body)
        .map_err(|_| GateError::validation("script is not valid UTF-8"))?;

    let summary = state.loader().load_script(script).await?;
    Ok(Json(UploadResponse {
        message: "Database loaded successfully".to_string(),
        filename,
        tables: summary.tables,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "query-gate",
        "version": env!("CARGO_PKG_VERSION"),
        "pool": state.pool().status(),
    }))
}
