use std::collections::BTreeMap;

use async_trait::async_trait;
use picks_core::{PickStatus, ScoredPick};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    merge_document, pick_to_document, select_pending, Document, PendingQuery, PickStore,
    StoreError,
};

/// Process-local document store. Used for tests, dry runs and `PICKS_STORE=memory`.
#[derive(Debug, Default)]
pub struct MemoryPickStore {
    docs: Mutex<BTreeMap<String, Document>>,
}

impl MemoryPickStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.docs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.lock().await.is_empty()
    }

    pub async fn document(&self, id: &str) -> Option<Document> {
        self.docs.lock().await.get(id).cloned()
    }

    /// Stand-in for the settlement process writing an outcome.
    pub async fn set_status(&self, id: &str, status: PickStatus) -> bool {
        match self.docs.lock().await.get_mut(id) {
            Some(doc) => {
                doc.insert("status".into(), Value::String(status.as_str().into()));
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PickStore for MemoryPickStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.docs.lock().await.contains_key(id))
    }

    async fn batch_upsert_merge(&self, picks: &[ScoredPick]) -> Result<usize, StoreError> {
        let incoming = picks
            .iter()
            .map(|p| pick_to_document(p).map(|doc| (p.id.clone(), doc)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut docs = self.docs.lock().await;
        for (id, doc) in incoming {
            let merged = merge_document(docs.remove(&id), doc);
            docs.insert(id, merged);
        }
        Ok(picks.len())
    }

    async fn query_pending(&self, query: &PendingQuery) -> Result<Vec<ScoredPick>, StoreError> {
        let docs = self.docs.lock().await;
        select_pending(docs.iter(), query)
    }
}
