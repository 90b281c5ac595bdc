use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{FundKind, FundMetadata, HistoryRequest};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalNavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Raw provider output, before validation into a `NavSeries`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHistory {
    pub kind: FundKind,
    pub metadata: FundMetadata,
    pub points: Vec<ExternalNavPoint>,
}

impl ProviderHistory {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keeps only points inside the requested (inclusive) range.
    pub fn within(mut self, request: &HistoryRequest) -> Self {
        self.points.retain(|p| {
            request.start.map_or(true, |s| p.date >= s) && request.end.map_or(true, |e| p.date <= e)
        });
        self
    }
}

#[derive(Debug, Error)]
pub enum NavProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("fund {0} not found")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,
}

impl NavProviderError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, NavProviderError::NotFound(_))
    }
}

impl From<reqwest::Error> for NavProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            NavProviderError::RateLimited
        } else if e.is_decode() {
            NavProviderError::Parse(e.to_string())
        } else {
            NavProviderError::Network(e.to_string())
        }
    }
}

#[async_trait]
pub trait NavProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError>;
}

pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, NavProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("Mozilla/5.0 (compatible; fundscope/0.1)")
        .build()
        .map_err(|e| NavProviderError::Network(e.to_string()))
}
