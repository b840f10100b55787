//! The error taxonomy surfaced to HTTP clients, and its mapping to status
//! codes and the [`crate::response::ApiResponse`] envelope.

use crate::response::ApiResponse;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Alias already exists: {0}")]
    DuplicateAlias(String),

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Inactive: {0}")]
    Inactive(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Password required")]
    NeedsPassword,

    #[error("Incorrect password")]
    BadPassword,

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidUrl(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::DuplicateAlias(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::ValidationFailure(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Inactive(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::Expired(msg) => (StatusCode::GONE, msg.clone()),
            ApiError::NeedsPassword => (StatusCode::UNAUTHORIZED, "Password required".into()),
            ApiError::BadPassword => (StatusCode::UNAUTHORIZED, "Incorrect password".into()),
            ApiError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".into())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let mut response = ApiResponse::<()>::error(&message, status).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string())
        {
            response.headers_mut().insert("Retry-After", value);
        }
        response
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
