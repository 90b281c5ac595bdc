use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::models::{FundHistory, HistoryRequest};

/// Memo of fetched histories keyed by (code, start, end).
///
/// Entries are immutable once stored and live for the whole process.
#[derive(Clone, Default)]
pub struct NavCache {
    entries: Arc<DashMap<HistoryRequest, Arc<FundHistory>>>,
}

impl NavCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request: &HistoryRequest) -> Option<Arc<FundHistory>> {
        let hit = self.entries.get(request).map(|e| Arc::clone(e.value()));
        if hit.is_some() {
            debug!("Cache hit for {} [{:?}..{:?}]", request.code, request.start, request.end);
        }
        hit
    }

    /// Stores `history` unless an entry already exists; returns the stored one.
    pub fn insert(&self, request: HistoryRequest, history: FundHistory) -> Arc<FundHistory> {
        Arc::clone(self.entries.entry(request).or_insert_with(|| Arc::new(history)).value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FundKind, FundMetadata, NavSeries};

    fn history(name: &str) -> FundHistory {
        FundHistory {
            code: "000001".to_string(),
            kind: FundKind::OpenEnd,
            metadata: FundMetadata {
                name: Some(name.to_string()),
                ..FundMetadata::default()
            },
            series: NavSeries::default(),
        }
    }

    #[test]
    fn test_first_entry_is_kept() {
        let cache = NavCache::new();
        let key = HistoryRequest::unbounded("000001");

        cache.insert(key.clone(), history("first"));
        let stored = cache.insert(key.clone(), history("second"));

        assert_eq!(stored.metadata.name.as_deref(), Some("first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ranges_are_distinct_keys() {
        let cache = NavCache::new();
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1);

        cache.insert(HistoryRequest::unbounded("000001"), history("all"));
        assert!(cache.get(&HistoryRequest::new("000001", start, None)).is_none());
        assert!(cache.get(&HistoryRequest::unbounded("000001")).is_some());
    }
}
