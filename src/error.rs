use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::ports::StoreError;
use crate::use_cases::reconcile::ReconcileError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Payment gateway timed out: {0}")]
    GatewayTimeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::DuplicateKey(what) => AppError::Conflict(what),
            StoreError::Timeout(_) | StoreError::Database(_) => {
                AppError::DatabaseError(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Validation(msg) => AppError::Validation(msg),
            ReconcileError::NotFound(msg) => AppError::NotFound(msg),
            ReconcileError::Gateway(GatewayError::Timeout) => {
                AppError::GatewayTimeout(GatewayError::Timeout.to_string())
            }
            ReconcileError::Gateway(e) => AppError::Gateway(e.to_string()),
            ReconcileError::Signature(e) => {
                AppError::BadRequest(format!("Signature verification failed: {}", e))
            }
            ReconcileError::MalformedEvent(msg) => AppError::BadRequest(msg),
            ReconcileError::Invariant(msg) => AppError::Internal(msg),
            ReconcileError::Store(e) => AppError::from(e),
        }
    }
}
