//! Error types for the catalog and cart service
//!
//! Every failure carries a categorical [`ErrorCode`] and maps onto an HTTP
//! status; the JSON body is `{"error": {"code", "status", "message"}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::feed::FeedError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationFailed = 1001,
    MissingField = 1002,

    // Authentication errors (2xxx)
    Unauthorized = 2001,

    // Resource errors (4xxx)
    NotFound = 4001,
    Conflict = 4002,

    // Upstream errors (5xxx)
    FeedFetch = 5001,
    FeedParse = 5002,
    Mail = 5003,

    // Internal errors (9xxx)
    Database = 9001,
    Internal = 9002,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed request: {0}")]
    MissingField(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound { resource, id: id.to_string() }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Feed(FeedError::Fetch(_)) | Self::Feed(FeedError::TooLarge { .. }) => ErrorCode::FeedFetch,
            Self::Feed(_) => ErrorCode::FeedParse,
            Self::Mail(_) => ErrorCode::Mail,
            Self::Database(_) => ErrorCode::Database,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Feed(FeedError::Fetch(_)) | Self::Feed(FeedError::TooLarge { .. }) => StatusCode::BAD_GATEWAY,
            Self::Feed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Mail(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(db.message().to_string()),
            _ => Self::Database(e),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self::MissingField(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            AppError::Validation(_) | AppError::MissingField(_) | AppError::NotFound { .. } | AppError::Conflict(_) => {
                tracing::debug!(error_code = code.as_u16(), %message, "Client error");
            }
            AppError::Unauthorized => {
                tracing::info!(error_code = code.as_u16(), %message, "Auth error");
            }
            _ => {
                tracing::error!(error_code = code.as_u16(), %message, error = ?self, "Server error");
            }
        }

        let body = Json(json!({
            "error": {
                "code": code.as_u16(),
                "status": status.as_u16(),
                "message": message,
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingField("x".into()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::not_found("contact", "home").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Feed(FeedError::Fetch("down".into())).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Feed(FeedError::Parse("bad".into())).error_code(), ErrorCode::FeedParse);
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(AppError::not_found("product", 42).to_string(), "product not found: 42");
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        assert!(matches!(AppError::from(sqlx::Error::RowNotFound), AppError::Database(_)));
    }
}
