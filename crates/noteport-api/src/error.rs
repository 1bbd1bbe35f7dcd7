//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use noteport_core::ErrorKind;

/// API-level errors with HTTP status mapping.
///
/// Every variant renders as `{"success": false, "error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<noteport_core::Error> for ApiError {
    fn from(err: noteport_core::Error) -> Self {
        match &err {
            noteport_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            _ => match err.kind() {
                ErrorKind::Validation => ApiError::BadRequest(err.to_string()),
                ErrorKind::Conversion | ErrorKind::Persistence => {
                    ApiError::Internal(err.to_string())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Import request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
