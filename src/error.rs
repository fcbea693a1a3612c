//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Ledger errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<crate::domain::DomainError> for AppError {
    fn from(err: crate::domain::DomainError) -> Self {
        AppError::Ledger(LedgerError::Validation(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status, machine-readable code and optional details
    fn classify(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            AppError::Ledger(err) => match err {
                LedgerError::Validation(domain_err) => (
                    StatusCode::BAD_REQUEST,
                    domain_err.code(),
                    Some(domain_err.to_string()),
                ),

                // 404 Not Found
                LedgerError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, "account_not_found", Some(id.to_string()))
                }
                LedgerError::AccountNotFound { who, id } => (
                    StatusCode::NOT_FOUND,
                    "account_not_found",
                    Some(format!("{who} {id}")),
                ),

                // 409 Conflict
                LedgerError::DuplicateEmail(email) => {
                    (StatusCode::CONFLICT, "duplicate_email", Some(email.clone()))
                }
                LedgerError::Conflict(_) => (StatusCode::CONFLICT, "transaction_conflict", None),

                // 422 Unprocessable Entity
                LedgerError::InsufficientFunds { have, need } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "insufficient_funds",
                    Some(format!("have {have}, need {need}")),
                ),

                // 503 Service Unavailable
                LedgerError::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, "timeout", None),

                // 500 Internal Server Error
                LedgerError::Storage(e) => {
                    tracing::error!("Storage error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.classify();

        // Server-side failures keep their message out of the body
        let error = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
