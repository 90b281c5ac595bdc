use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::models::{FundHistory, FundSnapshot};
use crate::services::valuation_service::AnalysisSession;

/// Everything the API keeps about the last successful query of one fund.
#[derive(Debug, Clone)]
pub struct FundSession {
    pub history: Arc<FundHistory>,
    pub snapshot: Option<FundSnapshot>,
    pub analysis: AnalysisSession,
}

/// Proof that a query was started; only the newest ticket per code may
/// publish its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    code: String,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    session: Option<Arc<FundSession>>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a query for `code`, superseding any query still in flight.
    pub fn begin(&self, code: &str) -> QueryTicket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(code.to_string()).or_default();
        slot.generation += 1;

        QueryTicket {
            code: code.to_string(),
            generation: slot.generation,
        }
    }

    /// Publishes a finished query. Returns `false` and drops the session when
    /// a newer query for the same code has started since.
    pub fn complete(&self, ticket: &QueryTicket, session: FundSession) -> bool {
        let mut slots = self.slots.lock();
        let slot = slots.entry(ticket.code.clone()).or_default();

        if slot.generation != ticket.generation {
            debug!(
                "Discarding stale result for {} (generation {} < {})",
                ticket.code, ticket.generation, slot.generation
            );
            return false;
        }

        slot.session = Some(Arc::new(session));
        true
    }

    pub fn get(&self, code: &str) -> Option<Arc<FundSession>> {
        self.slots.lock().get(code).and_then(|slot| slot.session.clone())
    }

    /// Replaces the current session of `code` with `f(current)`.
    pub fn update<E>(
        &self,
        code: &str,
        f: impl FnOnce(&FundSession) -> Result<FundSession, E>,
    ) -> Option<Result<Arc<FundSession>, E>> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(code)?;
        let current = slot.session.as_ref()?;

        Some(f(current).map(|next| {
            let next = Arc::new(next);
            slot.session = Some(Arc::clone(&next));
            next
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FundKind, FundMetadata, NavPoint, NavSeries};
    use crate::services::scoring_service::ScoringMode;
    use chrono::NaiveDate;

    fn session(nav: f64) -> FundSession {
        let series = NavSeries::new(vec![NavPoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), nav)]).unwrap();
        FundSession {
            history: Arc::new(FundHistory {
                code: "000001".to_string(),
                kind: FundKind::OpenEnd,
                metadata: FundMetadata::default(),
                series: series.clone(),
            }),
            snapshot: None,
            analysis: AnalysisSession::new(series, ScoringMode::Base),
        }
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let store = SessionStore::new();
        let slow = store.begin("000001");
        let fast = store.begin("000001");

        assert!(store.complete(&fast, session(2.0)));
        assert!(!store.complete(&slow, session(1.0)));

        let current = store.get("000001").unwrap();
        assert_eq!(current.history.series.last().unwrap().value, 2.0);
    }

    #[test]
    fn test_codes_are_independent() {
        let store = SessionStore::new();
        let a = store.begin("000001");
        let _b = store.begin("000002");

        assert!(store.complete(&a, session(1.0)));
        assert!(store.get("000002").is_none());
    }

    #[test]
    fn test_update_replaces_session() {
        let store = SessionStore::new();
        assert!(store.update("000001", |s| Ok::<_, ()>(s.clone())).is_none());

        let ticket = store.begin("000001");
        store.complete(&ticket, session(1.0));

        let updated = store
            .update("000001", |s| {
                let analysis = s.analysis.project(10.0).map_err(|_| ())?;
                Ok::<_, ()>(FundSession { analysis, ..s.clone() })
            })
            .unwrap()
            .unwrap();

        assert!(updated.analysis.projection().is_some());
        assert!(store.get("000001").unwrap().analysis.projection().is_some());
    }
}
