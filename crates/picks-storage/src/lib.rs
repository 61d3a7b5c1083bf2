//! Pick persistence (merge-upsert document stores) + HTTP fetch utilities.

use std::cmp::Ordering;

use async_trait::async_trait;
use picks_core::{PickStatus, ScoredPick, Sport, STORE_OWNED_FIELDS};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod fetch;
pub mod file;
pub mod memory;
pub mod postgres;

pub use fetch::{
    classify_reqwest_error, classify_status, BackoffPolicy, FetchError, FetchedText,
    HttpClientConfig, HttpFetcher, RetryDisposition, TokenBucketConfig,
};
pub use file::FilePickStore;
pub use memory::MemoryPickStore;
pub use postgres::PgPickStore;

pub const CRATE_NAME: &str = "picks-storage";

/// A stored pick document. Fields written by other processes survive merges untouched.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt document `{id}`: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Read side used by the UI/settlement layer: pending picks ranked by consensus.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub sport: Option<Sport>,
    pub min_consensus: u32,
    pub limit: usize,
}

impl Default for PendingQuery {
    fn default() -> Self {
        Self {
            sport: None,
            min_consensus: 2,
            limit: 50,
        }
    }
}

#[async_trait]
pub trait PickStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Write all picks as one batch. Existing documents keep `firstSeen`, `status` and any
    /// field this pipeline does not write; new documents start `pending`.
    async fn batch_upsert_merge(&self, picks: &[ScoredPick]) -> Result<usize, StoreError>;

    async fn query_pending(&self, query: &PendingQuery) -> Result<Vec<ScoredPick>, StoreError>;
}

pub fn pick_to_document(pick: &ScoredPick) -> Result<Document, StoreError> {
    match serde_json::to_value(pick)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::Corrupt {
            id: pick.id.clone(),
            reason: "pick did not serialize to an object".into(),
        }),
    }
}

/// Merge `incoming` into `existing` (when present) using the store's ownership rules.
pub fn merge_document(existing: Option<Document>, mut incoming: Document) -> Document {
    match existing {
        Some(mut doc) => {
            for field in STORE_OWNED_FIELDS {
                incoming.remove(field);
            }
            doc.extend(incoming);
            doc
        }
        None => {
            incoming.insert(
                "status".into(),
                Value::String(PickStatus::Pending.as_str().into()),
            );
            incoming
        }
    }
}

pub fn document_to_pick(id: &str, doc: &Document) -> Result<ScoredPick, StoreError> {
    serde_json::from_value(Value::Object(doc.clone())).map_err(|err| StoreError::Corrupt {
        id: id.to_string(),
        reason: err.to_string(),
    })
}

pub fn rank_picks(a: &ScoredPick, b: &ScoredPick) -> Ordering {
    b.consensus_strength
        .cmp(&a.consensus_strength)
        .then_with(|| b.confidence_score.total_cmp(&a.confidence_score))
}

/// Apply a pending query to an in-process document set.
pub(crate) fn select_pending<'a>(
    docs: impl Iterator<Item = (&'a String, &'a Document)>,
    query: &PendingQuery,
) -> Result<Vec<ScoredPick>, StoreError> {
    let mut picks = Vec::new();
    for (id, doc) in docs {
        let pick = document_to_pick(id, doc)?;
        if pick.status != PickStatus::Pending {
            continue;
        }
        if query.sport.is_some_and(|sport| sport != pick.sport) {
            continue;
        }
        if pick.consensus_strength < query.min_consensus {
            continue;
        }
        picks.push(pick);
    }
    picks.sort_by(rank_picks);
    picks.truncate(query.limit);
    Ok(picks)
}
