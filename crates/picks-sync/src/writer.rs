use picks_core::ScoredPick;
use picks_storage::PickStore;
use tracing::{error, info};

use crate::error::PipelineError;

/// Batch merge-upsert of the run's new picks.
pub struct PersistenceWriter<'a> {
    store: &'a dyn PickStore,
}

impl<'a> PersistenceWriter<'a> {
    pub fn new(store: &'a dyn PickStore) -> Self {
        Self { store }
    }

    /// Returns the number of picks written. An empty batch never touches the store.
    pub async fn write(&self, picks: &[ScoredPick]) -> Result<usize, PipelineError> {
        if picks.is_empty() {
            return Ok(0);
        }
        match self.store.batch_upsert_merge(picks).await {
            Ok(count) => {
                info!(backend = self.store.backend(), count, "picks written");
                Ok(count)
            }
            Err(source) => {
                error!(backend = self.store.backend(), attempted = picks.len(), error = %source, "batch write failed");
                Err(PipelineError::Persistence {
                    attempted: picks.len(),
                    source,
                })
            }
        }
    }
}
