use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::nav_provider::NavProviderError;
use crate::services::analysis_service::AnalysisError;
use crate::services::valuation_service::ValuationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Rate limited by external provider")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));

        if let AppError::RateLimited = self {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", HeaderValue::from_static("60"));
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

impl From<NavProviderError> for AppError {
    fn from(e: NavProviderError) -> Self {
        match e {
            NavProviderError::NotFound(code) => AppError::NotFound(format!("Fund {} not found", code)),
            NavProviderError::RateLimited => AppError::RateLimited,
            other => AppError::External(other.to_string()),
        }
    }
}

impl From<ValuationError> for AppError {
    fn from(e: ValuationError) -> Self {
        match e {
            ValuationError::NoData => AppError::InsufficientData(e.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::InsufficientData(msg) => AppError::InsufficientData(msg),
        }
    }
}
