use async_trait::async_trait;
use tracing::{info, warn};

use crate::external::nav_provider::{NavProvider, NavProviderError, ProviderHistory};
use crate::models::HistoryRequest;

/// Tries the open-end fund lookup first and falls back to the exchange-traded
/// lookup when it errors or returns no usable points.
///
/// The returned history carries the `FundKind` of whichever provider answered.
pub struct FallbackProvider {
    primary: Box<dyn NavProvider>,
    fallback: Box<dyn NavProvider>,
}

impl FallbackProvider {
    pub fn new(primary: Box<dyn NavProvider>, fallback: Box<dyn NavProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl NavProvider for FallbackProvider {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
        let code = &request.code;

        let primary_error = match self.primary.fetch_history(request).await {
            Ok(history) if !history.is_empty() => {
                info!("✓ Fetched {} from {} ({} points)", code, self.primary.name(), history.points.len());
                return Ok(history);
            }
            Ok(_) => {
                info!("⚠️ {} returned no data for {}, trying {}", self.primary.name(), code, self.fallback.name());
                None
            }
            Err(e) => {
                warn!("{} failed for {}: {}. Trying {}", self.primary.name(), code, e, self.fallback.name());
                Some(e)
            }
        };

        match self.fallback.fetch_history(request).await {
            Ok(history) => {
                if !history.is_empty() {
                    info!("✓ Fetched {} from {} ({} points)", code, self.fallback.name(), history.points.len());
                }
                Ok(history)
            }
            // An unknown code on both sides is reported as such. Otherwise the
            // primary's error is more informative than the fallback's miss.
            Err(NavProviderError::NotFound(_)) => match primary_error {
                Some(NavProviderError::NotFound(_)) | None => Err(NavProviderError::NotFound(code.clone())),
                Some(e) => Err(e),
            },
            Err(e) => {
                warn!("{} failed for {}: {}", self.fallback.name(), code, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::nav_provider::ExternalNavPoint;
    use crate::models::{FundKind, FundMetadata};
    use chrono::NaiveDate;

    enum Canned {
        Points(FundKind, usize),
        NotFound,
        Network,
    }

    struct StubProvider(Canned);

    #[async_trait]
    impl NavProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
            match self.0 {
                Canned::Points(kind, n) => Ok(ProviderHistory {
                    kind,
                    metadata: FundMetadata::default(),
                    points: (0..n)
                        .map(|i| ExternalNavPoint {
                            date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                            nav: 1.0,
                        })
                        .collect(),
                }),
                Canned::NotFound => Err(NavProviderError::NotFound(request.code.clone())),
                Canned::Network => Err(NavProviderError::Network("connection reset".into())),
            }
        }
    }

    fn provider(primary: Canned, fallback: Canned) -> FallbackProvider {
        FallbackProvider::new(Box::new(StubProvider(primary)), Box::new(StubProvider(fallback)))
    }

    #[tokio::test]
    async fn test_primary_answer_wins() {
        let p = provider(Canned::Points(FundKind::OpenEnd, 3), Canned::Points(FundKind::ExchangeTraded, 5));
        let history = p.fetch_history(&HistoryRequest::unbounded("000001")).await.unwrap();
        assert_eq!(history.kind, FundKind::OpenEnd);
    }

    #[tokio::test]
    async fn test_empty_primary_falls_back() {
        let p = provider(Canned::Points(FundKind::OpenEnd, 0), Canned::Points(FundKind::ExchangeTraded, 5));
        let history = p.fetch_history(&HistoryRequest::unbounded("510300")).await.unwrap();
        assert_eq!(history.kind, FundKind::ExchangeTraded);
        assert_eq!(history.points.len(), 5);
    }

    #[tokio::test]
    async fn test_not_found_on_both_sides() {
        let p = provider(Canned::NotFound, Canned::NotFound);
        let err = p.fetch_history(&HistoryRequest::unbounded("999999")).await.unwrap_err();
        assert!(matches!(err, NavProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_primary_error_kept_when_fallback_misses() {
        let p = provider(Canned::Network, Canned::NotFound);
        let err = p.fetch_history(&HistoryRequest::unbounded("000001")).await.unwrap_err();
        assert!(matches!(err, NavProviderError::Network(_)));
    }
}
