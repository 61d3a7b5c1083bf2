//! Drops scored picks the store already knows about.
//!
//! The existence check is not atomic with the later write. Two overlapping runs can both see a
//! pick as new; the merge-upsert in the writer makes the second write harmless.

use picks_core::ScoredPick;
use picks_storage::PickStore;
use tracing::{debug, warn};

use crate::error::PipelineError;

pub const DEFAULT_FAILURE_LIMIT: usize = 3;

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub fresh: Vec<ScoredPick>,
    pub already_known: usize,
    pub lookup_failures: usize,
}

pub struct Deduplicator<'a> {
    store: &'a dyn PickStore,
    failure_limit: usize,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a dyn PickStore, failure_limit: usize) -> Self {
        Self {
            store,
            failure_limit: failure_limit.max(1),
        }
    }

    /// Keep picks whose id is absent from the store. A failed lookup drops that pick (a missed
    /// pick beats a duplicate); `failure_limit` consecutive failures, or every lookup failing,
    /// means the store itself is down and the run is aborted.
    pub async fn retain_new(&self, picks: Vec<ScoredPick>) -> Result<DedupOutcome, PipelineError> {
        let total = picks.len();
        let mut outcome = DedupOutcome::default();
        let mut consecutive = 0usize;

        for pick in picks {
            match self.store.exists(&pick.id).await {
                Ok(true) => {
                    consecutive = 0;
                    outcome.already_known += 1;
                    debug!(id = %pick.id, "pick already stored");
                }
                Ok(false) => {
                    consecutive = 0;
                    outcome.fresh.push(pick);
                }
                Err(err) => {
                    consecutive += 1;
                    outcome.lookup_failures += 1;
                    warn!(id = %pick.id, error = %err, "existence check failed; pick skipped");
                    if consecutive >= self.failure_limit || outcome.lookup_failures == total {
                        return Err(PipelineError::StoreUnreachable {
                            failures: outcome.lookup_failures,
                            source: err,
                        });
                    }
                }
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use picks_core::{LineRange, Operator, PickKind, PickStatus, Sport};
    use picks_storage::{MemoryPickStore, PendingQuery, StoreError};

    fn pick(id: &str) -> ScoredPick {
        ScoredPick {
            id: id.into(),
            sport: Sport::Nba,
            kind: PickKind::Spread,
            subject: "Lakers".into(),
            operator: Operator::Minus,
            display_pick: "Lakers -6".into(),
            adjusted_pick: "Lakers -6".into(),
            adjusted_line: 6.0,
            consensus_strength: 2,
            confidence_score: 0.8,
            adjustment_reason: String::new(),
            line_range: LineRange { min: 6.0, max: 6.0 },
            sources: vec![],
            first_seen: Utc::now(),
            last_updated: Utc::now(),
            status: PickStatus::Pending,
        }
    }

    /// Fails lookups for ids starting with `bad`.
    struct Flaky;

    #[async_trait]
    impl PickStore for Flaky {
        fn backend(&self) -> &'static str {
            "flaky"
        }

        async fn exists(&self, id: &str) -> Result<bool, StoreError> {
            if id.starts_with("bad") {
                Err(StoreError::Unavailable("timeout".into()))
            } else {
                Ok(false)
            }
        }

        async fn batch_upsert_merge(&self, picks: &[ScoredPick]) -> Result<usize, StoreError> {
            Ok(picks.len())
        }

        async fn query_pending(&self, _query: &PendingQuery) -> Result<Vec<ScoredPick>, StoreError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn known_ids_are_dropped() {
        let store = MemoryPickStore::new();
        store.batch_upsert_merge(&[pick("lakers_-6")]).await.unwrap();
        let outcome = Deduplicator::new(&store, 3)
            .retain_new(vec![pick("lakers_-6"), pick("knicks_+3")])
            .await
            .unwrap();
        assert_eq!(outcome.already_known, 1);
        assert_eq!(outcome.fresh.len(), 1);
        assert_eq!(outcome.fresh[0].id, "knicks_+3");
    }

    #[tokio::test]
    async fn isolated_lookup_failure_skips_the_pick() {
        let outcome = Deduplicator::new(&Flaky, 3)
            .retain_new(vec![pick("a"), pick("bad_1"), pick("b")])
            .await
            .unwrap();
        assert_eq!(outcome.lookup_failures, 1);
        let ids: Vec<&str> = outcome.fresh.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn repeated_failures_escalate() {
        let err = Deduplicator::new(&Flaky, 2)
            .retain_new(vec![pick("a"), pick("bad_1"), pick("bad_2"), pick("b")])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StoreUnreachable { failures: 2, .. }));

        let err = Deduplicator::new(&Flaky, 3)
            .retain_new(vec![pick("bad_only")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "store_unreachable");
    }
}
