//! Structured Control API errors.
//!
//! Every failure becomes `{ "error_kind": ..., "message": ... }` with a
//! stable kind: operators branch on `circuit_open` vs `backend_unavailable`
//! vs `bad_configuration` instead of parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::validation::ValidationError;
use crate::error::{SentinelError, StoreError};

pub struct ApiError {
    status: StatusCode,
    error_kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_configuration(errors: &[ValidationError]) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error_kind: "bad_configuration",
            message: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error_kind": self.error_kind,
                "message": self.message,
            })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let (status, error_kind) = match &e {
            StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            StoreError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
            StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
        };
        Self {
            status,
            error_kind,
            message: e.to_string(),
        }
    }
}

impl From<SentinelError> for ApiError {
    fn from(e: SentinelError) -> Self {
        match e {
            SentinelError::CircuitOpen { .. } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error_kind: "circuit_open",
                message: e.to_string(),
            },
            SentinelError::Backend(_) => Self {
                status: StatusCode::BAD_GATEWAY,
                error_kind: "backend_unavailable",
                message: e.to_string(),
            },
            SentinelError::Store(store) => store.into(),
        }
    }
}
