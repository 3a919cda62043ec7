//! Error types for zero-screener.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::data::ProviderError;

/// Run-level screening errors.
///
/// Per-candidate fetch failures and malformed fields never surface here;
/// they are absorbed where they occur.
#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("Market data provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScreenError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidCriteria(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::InvalidCriteria(_) => "INVALID_CRITERIA",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ScreenError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": ApiError {
                code: self.code().to_string(),
                message: self.to_string(),
            }
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}
