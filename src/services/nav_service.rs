use std::sync::Arc;

use chrono::NaiveDate;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::RetryPolicy;
use crate::errors::AppError;
use crate::external::nav_provider::{NavProvider, NavProviderError, ProviderHistory};
use crate::models::{FundHistory, FundSnapshot, HistoryRequest, NavPoint, NavSeries, QuickRange};
use crate::services::failure_cache::{FailureCache, FailureType};
use crate::services::nav_cache::NavCache;

/// Fetches NAV histories with retry, failure suppression and memoisation.
#[derive(Clone)]
pub struct NavService {
    provider: Arc<dyn NavProvider>,
    cache: NavCache,
    failures: FailureCache,
    retry: RetryPolicy,
}

impl NavService {
    pub fn new(provider: Arc<dyn NavProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            cache: NavCache::new(),
            failures: FailureCache::new(),
            retry,
        }
    }

    pub fn cache(&self) -> &NavCache {
        &self.cache
    }

    pub fn failures(&self) -> &FailureCache {
        &self.failures
    }

    /// Calls the provider up to `max_attempts` times. Errors and empty
    /// results are retried; an unknown code is not.
    ///
    /// An empty history after the last attempt is returned as is so the
    /// caller can report insufficient data.
    pub async fn fetch_with_retry(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_empty = None;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                warn!(
                    "Retrying {} in {}ms (attempt {}/{})",
                    request.code,
                    delay.as_millis(),
                    attempt + 1,
                    max_attempts
                );
                sleep(delay).await;
            }

            match self.provider.fetch_history(request).await {
                Ok(history) if !history.is_empty() => return Ok(history),
                Ok(history) => {
                    warn!("{} returned no data for {}", self.provider.name(), request.code);
                    last_empty = Some(history);
                    last_error = None;
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("{} failed for {}: {}", self.provider.name(), request.code, e);
                    last_error = Some(e);
                }
            }
        }

        match (last_error, last_empty) {
            (Some(e), _) => Err(e),
            (None, Some(empty)) => Ok(empty),
            (None, None) => Err(NavProviderError::BadResponse("no attempt was made".to_string())),
        }
    }

    /// Validated history for the request, from cache when possible.
    pub async fn fetch_history(&self, request: &HistoryRequest) -> Result<Arc<FundHistory>, AppError> {
        if let Some(history) = self.cache.get(request) {
            return Ok(history);
        }

        if let Some(failure) = self.failures.is_failed(&request.code) {
            info!(
                "⚠️ Skipping lookup for {} - recent failure ({}). Will retry after {}",
                request.code,
                failure.failure_type,
                failure.retry_after()
            );
            return Err(match failure.failure_type {
                FailureType::NotFound => AppError::NotFound(format!("Fund {} not found", request.code)),
                FailureType::RateLimited => AppError::RateLimited,
                FailureType::ProviderError => AppError::External(format!(
                    "Fund {} lookup failed recently, retry after {}",
                    request.code,
                    failure.retry_after()
                )),
            });
        }

        let raw = match self.fetch_with_retry(request).await {
            Ok(raw) => raw,
            Err(e) => {
                self.failures.record_failure(&request.code, FailureType::from(&e));
                error!("✗ Failed to fetch NAV history for {}: {}", request.code, e);
                return Err(AppError::from(e));
            }
        };
        self.failures.clear(&request.code);

        let points = raw.points.iter().map(|p| NavPoint::new(p.date, p.nav)).collect();
        let series = NavSeries::from_unordered(points)
            .map_err(|e| AppError::External(format!("Invalid NAV data for {}: {}", request.code, e)))?
            .filter_range(request.start, request.end);

        let history = FundHistory {
            code: request.code.clone(),
            kind: raw.kind,
            metadata: raw.metadata,
            series,
        };

        if history.series.is_empty() {
            // Not memoised so a later query can pick up fresh data
            warn!("No NAV data for {} in the requested range", request.code);
            return Ok(Arc::new(history));
        }

        info!(
            "✓ Loaded {} NAV points for {} ({})",
            history.series.len(),
            request.code,
            history.kind
        );
        Ok(self.cache.insert(request.clone(), history))
    }

    /// Headline numbers. The one-year change falls back to the full
    /// history when `history` does not reach back one year.
    pub async fn fund_snapshot(&self, history: &FundHistory, today: NaiveDate) -> Option<FundSnapshot> {
        let request = HistoryRequest::unbounded(history.code.clone());
        let full = if !history.series.is_empty() && FundSnapshot::needs_full_history(&history.series, today) {
            match self.fetch_history(&request).await {
                Ok(full) => Some(full),
                Err(e) => {
                    warn!("Could not load full history of {} for the one-year change: {}", history.code, e);
                    None
                }
            }
        } else {
            None
        };

        FundSnapshot::compute(&history.series, full.as_ref().map(|h| &h.series), today)
    }
}

/// Turns the query's start/end/range into an inclusive date window.
/// A quick range overrides an explicit start.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    range: Option<QuickRange>,
    today: NaiveDate,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError> {
    let start = match range {
        Some(QuickRange::SinceInception) => None,
        Some(range) => Some(range.start_date(today)),
        None => start,
    };

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AppError::Validation(format!("Start date {} is after end date {}", s, e)));
        }
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::nav_provider::ExternalNavPoint;
    use crate::models::{FundKind, FundMetadata};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails `failures` times, then returns three points.
    struct FlakyProvider {
        calls: AtomicU32,
        failures: u32,
        error: fn(&str) -> NavProviderError,
    }

    impl FlakyProvider {
        fn new(failures: u32, error: fn(&str) -> NavProviderError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                error,
            }
        }
    }

    #[async_trait]
    impl NavProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err((self.error)(&request.code));
            }
            Ok(ProviderHistory {
                kind: FundKind::OpenEnd,
                metadata: FundMetadata::default(),
                points: (1..=3)
                    .map(|d| ExternalNavPoint {
                        date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
                        nav: 1.0 + d as f64 / 100.0,
                    })
                    .collect(),
            }
            .within(request))
        }
    }

    fn no_wait(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    fn network(_: &str) -> NavProviderError {
        NavProviderError::Network("timeout".into())
    }

    fn not_found(code: &str) -> NavProviderError {
        NavProviderError::NotFound(code.to_string())
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let provider = Arc::new(FlakyProvider::new(2, network));
        let service = NavService::new(provider.clone(), no_wait(5));

        let history = service.fetch_history(&HistoryRequest::unbounded("000001")).await.unwrap();

        assert_eq!(history.series.len(), 3);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried_and_is_remembered() {
        let provider = Arc::new(FlakyProvider::new(u32::MAX, not_found));
        let service = NavService::new(provider.clone(), no_wait(5));
        let request = HistoryRequest::unbounded("999999");

        let err = service.fetch_history(&request).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let again = service.fetch_history(&request).await.unwrap_err();
        assert!(matches!(again, AppError::NotFound(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let provider = Arc::new(FlakyProvider::new(u32::MAX, network));
        let service = NavService::new(provider.clone(), no_wait(3));

        let err = service.fetch_history(&HistoryRequest::unbounded("000001")).await.unwrap_err();

        assert!(matches!(err, AppError::External(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_results_are_memoised_per_range() {
        let provider = Arc::new(FlakyProvider::new(0, network));
        let service = NavService::new(provider.clone(), no_wait(1));
        let start = NaiveDate::from_ymd_opt(2024, 1, 2);

        let ranged = service.fetch_history(&HistoryRequest::new("000001", start, None)).await.unwrap();
        service.fetch_history(&HistoryRequest::new("000001", start, None)).await.unwrap();

        assert_eq!(ranged.series.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache().len(), 1);
    }

    #[test]
    fn test_resolve_range() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let (start, end) = resolve_range(None, None, Some(QuickRange::OneMonth), today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 5, 31));
        assert!(end.is_none());

        let (start, _) = resolve_range(Some(today), None, Some(QuickRange::SinceInception), today).unwrap();
        assert!(start.is_none());

        let bad = resolve_range(Some(today), NaiveDate::from_ymd_opt(2024, 1, 1), None, today);
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }
}
