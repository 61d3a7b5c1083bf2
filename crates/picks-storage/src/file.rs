use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use picks_core::ScoredPick;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    merge_document, pick_to_document, select_pending, Document, PendingQuery, PickStore,
    StoreError,
};

type Collection = BTreeMap<String, Document>;

/// JSON document store: one file holding every pick keyed by id. Each batch rewrites the file
/// through a temp file + rename, so readers only ever see a whole batch or none of it.
#[derive(Debug)]
pub struct FilePickStore {
    path: PathBuf,
    /// Serializes load → merge → persist within this process only. Another process (or a
    /// hand edit settling a pick) that writes the file between our load and persist is
    /// overwritten; use the Postgres store when anything besides the pipeline writes.
    write_lock: Mutex<()>,
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl FilePickStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Collection, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Collection::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Collection::new()),
            Err(err) => Err(io_err(&self.path, err)),
        }
    }

    async fn persist(&self, docs: &Collection) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_err(parent, e))?;

        let temp_path = parent.join(format!(".picks.{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|e| io_err(&temp_path, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| io_err(&temp_path, e))?;
        file.flush().await.map_err(|e| io_err(&temp_path, e))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(io_err(&self.path, err));
        }
        debug!(path = %self.path.display(), documents = docs.len(), "pick store flushed");
        Ok(())
    }
}

#[async_trait]
impl PickStore for FilePickStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.load().await?.contains_key(id))
    }

    async fn batch_upsert_merge(&self, picks: &[ScoredPick]) -> Result<usize, StoreError> {
        if picks.is_empty() {
            return Ok(0);
        }
        let _guard = self.write_lock.lock().await;
        let mut docs = self.load().await?;
        for pick in picks {
            let incoming = pick_to_document(pick)?;
            let merged = merge_document(docs.remove(&pick.id), incoming);
            docs.insert(pick.id.clone(), merged);
        }
        self.persist(&docs).await?;
        Ok(picks.len())
    }

    async fn query_pending(&self, query: &PendingQuery) -> Result<Vec<ScoredPick>, StoreError> {
        let docs = self.load().await?;
        select_pending(docs.iter(), query)
    }
}
