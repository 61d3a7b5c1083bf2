//! Source adapter contracts + Reddit / RSS / fixture adapters.
//!
//! Every adapter turns one external feed into `RawPick`s. Adapters report failure through
//! `SourceFetchResult { success: false, .. }` and never abort the caller.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picks_core::{RawPick, Sport};
use picks_storage::{FetchError, HttpFetcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub mod extract;
pub mod fixture;
pub mod reddit;
pub mod rss;

pub use fixture::FixtureAdapter;
pub use reddit::RedditAdapter;
pub use rss::RssFeedAdapter;

pub const CRATE_NAME: &str = "picks-adapters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Reddit,
    Rss,
    Fixture,
}

/// One RSS feed (or feed tag) of a multi-feed source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedTarget {
    pub url: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sport: Option<Sport>,
}

/// Entry of the source registry (`sources.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    pub kind: SourceKind,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub feeds: Vec<FeedTarget>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub require_pick_content: bool,
    #[serde(default)]
    pub fixture_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub run_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    /// Pause between consecutive requests inside one adapter.
    pub request_delay: Duration,
    pub workspace_root: PathBuf,
}

impl AdapterContext {
    pub fn new(run_id: Uuid, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            run_id,
            fetched_at: Utc::now(),
            request_delay: Duration::from_millis(500),
            workspace_root: workspace_root.into(),
        }
    }
}

/// Outcome of one adapter invocation as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFetchResult {
    pub source_id: String,
    pub success: bool,
    pub picks: Vec<RawPick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceFetchResult {
    pub fn ok(source_id: &str, picks: Vec<RawPick>) -> Self {
        Self {
            source_id: source_id.to_string(),
            success: true,
            picks,
            error: None,
        }
    }

    pub fn failed(source_id: &str, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            success: false,
            picks: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("malformed payload from {source_id}: {reason}")]
    Malformed { source_id: String, reason: String },
    #[error("every target of {source_id} failed ({failures} attempted)")]
    AllTargetsFailed { source_id: String, failures: usize },
    #[error("misconfigured source {source_id}: {reason}")]
    Config { source_id: String, reason: String },
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;
    fn kind(&self) -> SourceKind;

    async fn fetch_raw(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Vec<RawPick>, AdapterError>;

    /// Soft-failure boundary: errors become `success: false` with no picks.
    async fn fetch(&self, http: &HttpFetcher, ctx: &AdapterContext) -> SourceFetchResult {
        match self.fetch_raw(http, ctx).await {
            Ok(picks) => {
                info!(source_id = self.source_id(), picks = picks.len(), "source fetched");
                SourceFetchResult::ok(self.source_id(), picks)
            }
            Err(err) => {
                warn!(source_id = self.source_id(), error = %err, "source fetch failed");
                SourceFetchResult::failed(self.source_id(), err.to_string())
            }
        }
    }
}

fn config_error(config: &SourceConfig, reason: &str) -> AdapterError {
    AdapterError::Config {
        source_id: config.source_id.clone(),
        reason: reason.to_string(),
    }
}

/// Build the adapter described by a registry entry.
pub fn adapter_for_source(config: &SourceConfig) -> Result<Box<dyn SourceAdapter>, AdapterError> {
    match config.kind {
        SourceKind::Reddit => {
            if config.subreddits.is_empty() {
                return Err(config_error(config, "reddit source needs `subreddits`"));
            }
            let mut adapter = RedditAdapter::new(&config.source_id, config.subreddits.clone());
            if let Some(base_url) = &config.base_url {
                adapter = adapter.with_base_url(base_url);
            }
            Ok(Box::new(adapter))
        }
        SourceKind::Rss => {
            if config.feeds.is_empty() {
                return Err(config_error(config, "rss source needs `feeds`"));
            }
            let confidence = config.confidence.unwrap_or(rss::DEFAULT_FEED_CONFIDENCE);
            Ok(Box::new(
                RssFeedAdapter::new(&config.source_id, config.feeds.clone(), confidence)
                    .require_pick_content(config.require_pick_content),
            ))
        }
        SourceKind::Fixture => {
            let Some(path) = &config.fixture_path else {
                return Err(config_error(config, "fixture source needs `fixture_path`"));
            };
            Ok(Box::new(FixtureAdapter::new(&config.source_id, path)))
        }
    }
}
