use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::external::nav_provider::NavProviderError;

/// A recent failed lookup for one fund code.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub failure_type: FailureType,
    pub ttl_minutes: i64,
}

impl FailureInfo {
    pub fn retry_after(&self) -> DateTime<Utc> {
        self.failed_at + Duration::minutes(self.ttl_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Neither lookup knows the code
    NotFound,
    RateLimited,
    /// Network, HTTP or parse errors after all retries
    ProviderError,
}

impl FailureType {
    fn ttl_minutes(self) -> i64 {
        match self {
            FailureType::NotFound => 30,
            FailureType::RateLimited => 2,
            FailureType::ProviderError => 5,
        }
    }
}

impl From<&NavProviderError> for FailureType {
    fn from(e: &NavProviderError) -> Self {
        match e {
            NavProviderError::NotFound(_) => FailureType::NotFound,
            NavProviderError::RateLimited => FailureType::RateLimited,
            _ => FailureType::ProviderError,
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureType::NotFound => write!(f, "not_found"),
            FailureType::RateLimited => write!(f, "rate_limited"),
            FailureType::ProviderError => write!(f, "provider_error"),
        }
    }
}

/// Thread-safe record of fund codes whose lookup just failed, so a burst of
/// requests for a bad code does not hammer the data source.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<String, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded failure, if it is still within its TTL.
    pub fn is_failed(&self, code: &str) -> Option<FailureInfo> {
        let info = self.cache.get(code)?.value().clone();

        if Utc::now() < info.retry_after() {
            Some(info)
        } else {
            self.cache.remove(code);
            None
        }
    }

    pub fn record_failure(&self, code: &str, failure_type: FailureType) {
        let info = FailureInfo {
            failed_at: Utc::now(),
            failure_type,
            ttl_minutes: failure_type.ttl_minutes(),
        };
        self.cache.insert(code.to_string(), info);
    }

    pub fn clear(&self, code: &str) {
        self.cache.remove(code);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_records_and_retrieves_failures() {
        let cache = FailureCache::new();
        cache.record_failure("999999", FailureType::NotFound);

        let result = cache.is_failed("999999").unwrap();
        assert_eq!(result.failure_type, FailureType::NotFound);
        assert!(cache.is_failed("000001").is_none());
    }

    #[test]
    fn test_cache_clears_code() {
        let cache = FailureCache::new();
        cache.record_failure("000001", FailureType::ProviderError);
        cache.clear("000001");

        assert!(cache.is_failed("000001").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = FailureCache::new();
        cache.cache.insert(
            "000001".to_string(),
            FailureInfo {
                failed_at: Utc::now() - Duration::minutes(10),
                failure_type: FailureType::RateLimited,
                ttl_minutes: 2,
            },
        );

        assert!(cache.is_failed("000001").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_failure_type_from_provider_error() {
        assert_eq!(FailureType::from(&NavProviderError::RateLimited), FailureType::RateLimited);
        assert_eq!(
            FailureType::from(&NavProviderError::NotFound("1".into())),
            FailureType::NotFound
        );
        assert_eq!(
            FailureType::from(&NavProviderError::Parse("x".into())),
            FailureType::ProviderError
        );
    }
}
