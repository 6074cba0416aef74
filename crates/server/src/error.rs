//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("not found: {0}")]
    FileNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window elapses.
        retry_after_secs: u64,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("service error: {0}")]
    Service(#[from] crate::services::ServiceError),

    #[error("signer error: {0}")]
    Signer(#[from] gangway_signer::SignerError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "AuthenticationError",
            Self::AccessDenied(_) => "AccessDeniedError",
            Self::FileNotFound(_) => "FileNotFoundError",
            Self::BadRequest(_) => "BadRequestError",
            Self::RateLimited { .. } => "RateLimitExceeded",
            Self::Internal(_) | Self::Signer(_) => "InternalError",
            Self::Service(e) => e.code(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::FileNotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) | Self::Signer(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Service(e) => match e {
                crate::services::ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };

        if let Self::RateLimited { retry_after_secs } = &self {
            return (
                status,
                [("Retry-After", retry_after_secs.to_string())],
                Json(body),
            )
                .into_response();
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
