//! Error types for ffx-pa
//!
//! Validation failures are 400s raised before any outbound call. Provider
//! failures are 5xx and never retried here.

use crate::services::normalizer::NormalizeError;
use crate::services::practice::PracticeError;
use crate::services::provider::ProviderError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Required provider has no credentials (503)
    #[error("{0} is not configured")]
    ProviderNotConfigured(&'static str),

    /// Scoring payload missing expected fields (502)
    #[error(transparent)]
    Malformed(#[from] NormalizeError),

    /// Outbound call failed (502, or 504 on timeout)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(ProviderError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(provider) => ApiError::ProviderNotConfigured(provider),
            other => ApiError::ProviderUnavailable(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PracticeError> for ApiError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            PracticeError::Template(e) => ApiError::Internal(format!("Prompt template: {}", e)),
            PracticeError::Provider(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::ProviderNotConfigured(provider) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROVIDER_NOT_CONFIGURED",
                format!("{} is not configured", provider),
            ),
            ApiError::Malformed(ref err) => (
                StatusCode::BAD_GATEWAY,
                "MALFORMED_PROVIDER_RESPONSE",
                err.to_string(),
            ),
            ApiError::ProviderUnavailable(ref err) if err.is_timeout() => (
                StatusCode::GATEWAY_TIMEOUT,
                "PROVIDER_TIMEOUT",
                err.to_string(),
            ),
            ApiError::ProviderUnavailable(ref err) => (
                StatusCode::BAD_GATEWAY,
                "PROVIDER_UNAVAILABLE",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
