//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    // Caller-correctable input problems
    #[error("{0}")]
    Validation(String),

    // Well-formed request that violates a domain rule
    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    NotFound(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl ErrorResponse {
    fn new(code: &str, message: String) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        }
    }
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::BusinessRule(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }

            // Hide details for internal/security errors
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }

    /// Message recorded in the audit trail. Unlike `user_message`, internal
    /// causes are kept because the ledger is never shown to clients.
    pub fn audit_message(&self) -> String {
        match self {
            AppError::Database(e) => format!("Database error: {}", e),
            AppError::Internal(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    pub fn is_business_rule(&self) -> bool {
        matches!(self, AppError::BusinessRule(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse::new(self.code(), self.user_message());

        (status, Json(body)).into_response()
    }
}

/// Failure of an audited administrative action.
///
/// The client sees `Failed to <action>: <message>`, where the message is the
/// wrapped error's user-facing text.
#[derive(Error, Debug)]
#[error("Failed to {verb}: {source}")]
pub struct ActionFailure {
    verb: String,
    source: AppError,
}

impl ActionFailure {
    /// Wrap an error raised while performing `action` (e.g. `CREATE_USER`).
    pub fn new(action: &str, source: AppError) -> Self {
        Self {
            verb: action.to_ascii_lowercase().replace('_', " "),
            source,
        }
    }

    pub fn error(&self) -> &AppError {
        &self.source
    }

    pub fn into_inner(self) -> AppError {
        self.source
    }

    /// Message sent to the client.
    pub fn client_message(&self) -> String {
        format!("Failed to {}: {}", self.verb, self.source.user_message())
    }
}

impl IntoResponse for ActionFailure {
    fn into_response(self) -> Response {
        let status = self.source.status();
        let body = ErrorResponse::new(self.source.code(), self.client_message());

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, what: impl FnOnce() -> String) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, what: impl FnOnce() -> String) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(what()))
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn business_rule(msg: impl Into<String>) -> Self {
        AppError::BusinessRule(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
