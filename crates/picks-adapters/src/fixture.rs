//! Offline source that replays recorded mentions from a JSON file. Used for demos and for
//! exercising the whole pipeline without network access.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picks_core::RawPick;
use picks_storage::HttpFetcher;
use serde::Deserialize;

use crate::{AdapterContext, AdapterError, SourceAdapter, SourceKind};

#[derive(Debug, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    picks: Vec<FixturePick>,
}

#[derive(Debug, Deserialize)]
struct FixturePick {
    text: String,
    confidence: f64,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    posted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct FixtureAdapter {
    source_id: String,
    path: PathBuf,
}

impl FixtureAdapter {
    pub fn new(source_id: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            source_id: source_id.to_string(),
            path: path.into(),
        }
    }

    fn resolve(&self, root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        }
    }

    /// Raw picks recorded in a fixture document. Entries without their own `source_id` are
    /// attributed to this adapter.
    pub fn parse_fixture(
        &self,
        body: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<RawPick>, AdapterError> {
        let file: FixtureFile = serde_json::from_str(body).map_err(|e| AdapterError::Malformed {
            source_id: self.source_id.clone(),
            reason: e.to_string(),
        })?;
        Ok(file
            .picks
            .into_iter()
            .map(|p| RawPick {
                text: p.text,
                source_id: p.source_id.unwrap_or_else(|| self.source_id.clone()),
                confidence: p.confidence,
                posted_at: p.posted_at.unwrap_or(fetched_at),
                source_metadata: p.metadata,
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Fixture
    }

    async fn fetch_raw(
        &self,
        _http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Vec<RawPick>, AdapterError> {
        let path = self.resolve(&ctx.workspace_root);
        let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
            AdapterError::Anyhow(anyhow::anyhow!("reading fixture {}: {e}", path.display()))
        })?;
        self.parse_fixture(&body, ctx.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picks_storage::HttpClientConfig;
    use uuid::Uuid;

    const BODY: &str = r#"{
      "picks": [
        {"text": "LAL -6", "confidence": 0.8, "metadata": {"sport": "nba"}},
        {"text": "over 47.5", "confidence": 0.7, "source_id": "desk_b",
         "posted_at": "2026-10-15T18:00:00Z"}
      ]
    }"#;

    #[test]
    fn entries_default_to_adapter_source_id() {
        let adapter = FixtureAdapter::new("desk_a", "unused.json");
        let picks = adapter.parse_fixture(BODY, Utc::now()).expect("parse");
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].source_id, "desk_a");
        assert_eq!(picks[0].source_metadata["sport"], "nba");
        assert_eq!(picks[1].source_id, "desk_b");
        assert_eq!(picks[1].posted_at.to_rfc3339(), "2026-10-15T18:00:00+00:00");
    }

    #[tokio::test]
    async fn reads_relative_to_workspace_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("fixtures")).unwrap();
        std::fs::write(dir.path().join("fixtures/desk.json"), BODY).unwrap();

        let adapter = FixtureAdapter::new("desk_a", "fixtures/desk.json");
        let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
        let ctx = AdapterContext::new(Uuid::new_v4(), dir.path());
        let result = adapter.fetch(&http, &ctx).await;
        assert!(result.success);
        assert_eq!(result.picks.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_a_soft_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = FixtureAdapter::new("desk_a", "fixtures/missing.json");
        let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
        let ctx = AdapterContext::new(Uuid::new_v4(), dir.path());
        let result = adapter.fetch(&http, &ctx).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("missing.json"));
    }
}
