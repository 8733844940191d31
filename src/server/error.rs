//! Mapping of gateway errors to HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::GateError;

/// Errors a handler can return; every one renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Anything raised below the HTTP layer.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The request body could not be read as the endpoint expects.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The upload endpoint is switched off.
    #[error("uploads are disabled")]
    UploadsDisabled,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl ApiError {
    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Gate(err) => match err {
                GateError::EmptyQuery | GateError::Validation(_) | GateError::Database(_) => {
                    StatusCode::BAD_REQUEST
                }
                GateError::Rejected(_) => StatusCode::FORBIDDEN,
                GateError::Pool(_) => StatusCode::SERVICE_UNAVAILABLE,
                GateError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                GateError::Load(_) | GateError::Config(_) | GateError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::UploadsDisabled => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
