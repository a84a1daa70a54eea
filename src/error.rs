use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::constants::{
    ERR_BODY_TOO_LARGE, ERR_INTERNAL, ERR_INVALID_API_KEY, ERR_MISSING_API_KEY, ERR_RATE_LIMITED,
};
use crate::validation::ValidationError;

/// Storage accessor error
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::CheckViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::ForeignKeyViolation => {
                    return StoreError::Constraint(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Submission not found")]
    NotFound,

    #[error("Request body too large")]
    PayloadTooLarge,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::MissingApiKey | AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Store(_) => "storage_error",
            AppError::Validation(e) => e.code(),
            AppError::MissingApiKey => "missing_api_key",
            AppError::InvalidApiKey => "invalid_api_key",
            AppError::RateLimitExceeded => "rate_limit_exceeded",
            AppError::NotFound => "not_found",
            AppError::PayloadTooLarge => "payload_too_large",
        }
    }
}

/// Implement IntoResponse to convert AppError into HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match self {
            AppError::Store(ref e) => {
                tracing::error!(status = status.as_u16(), "Storage error: {:?}", e);
                ERR_INTERNAL.to_string()
            }
            AppError::Validation(ref e) => {
                tracing::info!(status = status.as_u16(), code, "Rejected request: {}", e);
                e.to_string()
            }
            AppError::MissingApiKey => ERR_MISSING_API_KEY.to_string(),
            AppError::InvalidApiKey => ERR_INVALID_API_KEY.to_string(),
            AppError::RateLimitExceeded => ERR_RATE_LIMITED.to_string(),
            AppError::NotFound => "Submission not found".to_string(),
            AppError::PayloadTooLarge => ERR_BODY_TOO_LARGE.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for application results
pub type Result<T> = std::result::Result<T, AppError>;
