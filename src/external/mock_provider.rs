use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::external::nav_provider::{ExternalNavPoint, NavProvider, NavProviderError, ProviderHistory};
use crate::models::{FundKind, FundMetadata, HistoryRequest};

const MOCK_TRADING_DAYS: usize = 750;

/// Offline provider producing a random-walk NAV for any code.
///
/// The walk is seeded from the fund code, so repeated lookups of the same
/// code return the same history.
pub struct MockProvider {
    days: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self { days: MOCK_TRADING_DAYS }
    }

    pub fn with_days(days: usize) -> Self {
        Self { days }
    }

    fn seed(code: &str) -> u64 {
        code.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ b as u64).wrapping_mul(0x100_0000_01b3))
    }

    /// Walks back from `today` over weekdays only.
    pub fn generate(&self, code: &str, today: NaiveDate) -> Vec<ExternalNavPoint> {
        let mut rng = StdRng::seed_from_u64(Self::seed(code));

        let mut dates = Vec::with_capacity(self.days);
        let mut day = today;
        while dates.len() < self.days {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                dates.push(day);
            }
            day -= Duration::days(1);
        }
        dates.reverse();

        let mut current = 1.0_f64;
        dates
            .into_iter()
            .map(|date| {
                current *= 1.0 + (rng.random::<f64>() - 0.5) * 0.02;
                ExternalNavPoint { date, nav: current }
            })
            .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NavProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<ProviderHistory, NavProviderError> {
        let points = self.generate(&request.code, Utc::now().date_naive());

        Ok(ProviderHistory {
            kind: FundKind::OpenEnd,
            metadata: FundMetadata {
                name: Some(format!("Mock Fund {}", request.code)),
                category: Some("mock".to_string()),
                inception_date: points.first().map(|p| p.date),
                manager: None,
                size: None,
            },
            points,
        }
        .within(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_is_deterministic_per_code() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let provider = MockProvider::with_days(40);

        let a = provider.generate("000001", today);
        let b = provider.generate("000001", today);
        let c = provider.generate("000002", today);

        assert_eq!(a.len(), 40);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.last().unwrap().date, today);
        assert!(a.windows(2).all(|w| w[0].date < w[1].date));
        assert!(a.iter().all(|p| p.nav > 0.0));
    }

    #[tokio::test]
    async fn test_mock_respects_range() {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(30);
        let history = MockProvider::with_days(100)
            .fetch_history(&HistoryRequest::new("000001", Some(start), None))
            .await
            .unwrap();

        assert!(!history.is_empty());
        assert!(history.points.iter().all(|p| p.date >= start));
    }
}
