//! Pipeline orchestrator: fetch → filter/parse → group/score → dedup → write.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use picks_adapters::{adapter_for_source, AdapterContext, SourceAdapter, SourceFetchResult};
use picks_core::ScoredPick;
use picks_storage::{HttpFetcher, PickStore};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{load_source_registry, SyncConfig};
use crate::dedup::{Deduplicator, DEFAULT_FAILURE_LIMIT};
use crate::error::PipelineError;
use crate::filter::{filter_candidates, parse_candidates, FilterConfig};
use crate::grouping::{Clusterer, GreedyClusterer};
use crate::report::write_run_report;
use crate::scoring::{ConsensusScorer, DEFAULT_MIN_CONSENSUS};
use crate::writer::PersistenceWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Fetching,
    Filtering,
    Scoring,
    Deduping,
    Writing,
    Done,
    Error,
}

impl RunState {
    /// Next state on the happy path; terminal states have none.
    pub fn successor(self) -> Option<RunState> {
        match self {
            RunState::Fetching => Some(RunState::Filtering),
            RunState::Filtering => Some(RunState::Scoring),
            RunState::Scoring => Some(RunState::Deduping),
            RunState::Deduping => Some(RunState::Writing),
            RunState::Writing => Some(RunState::Done),
            RunState::Done | RunState::Error => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }
}

#[derive(Debug)]
struct RunTracker {
    current: RunState,
    visited: Vec<RunState>,
}

impl RunTracker {
    fn start() -> Self {
        info!(state = ?RunState::Fetching, "run state");
        Self {
            current: RunState::Fetching,
            visited: vec![RunState::Fetching],
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.current.successor() {
            info!(state = ?next, "run state");
            self.current = next;
            self.visited.push(next);
        }
    }

    /// Moves to `Error` and returns the state the run failed in.
    fn fail(&mut self) -> RunState {
        let failed_in = self.current;
        self.current = RunState::Error;
        self.visited.push(RunState::Error);
        failed_in
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub raw_picks_found: usize,
    pub after_filtering: usize,
    pub after_scoring: usize,
    pub new_picks_added: usize,
    pub duration_ms: u64,
    pub sources_attempted: usize,
    pub sources_failed: usize,
    pub parsed_candidates: usize,
    pub groups_formed: usize,
    pub already_known: usize,
    pub dedup_lookup_failures: usize,
    /// Picks handed to the writer, whether or not the batch committed.
    pub write_attempted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source_id: String,
    pub success: bool,
    pub raw_picks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SourceFetchResult> for SourceReport {
    fn from(result: &SourceFetchResult) -> Self {
        Self {
            source_id: result.source_id.clone(),
            success: result.success,
            raw_picks: result.picks.len(),
            error: result.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: RunStats,
    /// Highest-ranked picks written by this run.
    pub top_picks: Vec<ScoredPick>,
    pub sources: Vec<SourceReport>,
    pub states: Vec<RunState>,
}

#[derive(Debug, Error)]
#[error("run {run_id} failed during {failed_in:?}: {error}")]
pub struct RunFailure {
    pub run_id: Uuid,
    #[source]
    pub error: PipelineError,
    pub failed_in: RunState,
    /// What the run had counted when it stopped; write counts are attempts, not commits.
    pub stats: RunStats,
    pub states: Vec<RunState>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub filter: FilterConfig,
    pub min_consensus: usize,
    pub source_timeout: Duration,
    pub request_delay: Duration,
    pub max_concurrent_sources: usize,
    pub dedup_failure_limit: usize,
    pub top_picks: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            min_consensus: DEFAULT_MIN_CONSENSUS,
            source_timeout: Duration::from_secs(60),
            request_delay: Duration::from_millis(500),
            max_concurrent_sources: 1,
            dedup_failure_limit: DEFAULT_FAILURE_LIMIT,
            top_picks: 5,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            filter: FilterConfig {
                min_confidence: config.min_confidence,
                min_text_len: config.min_text_len,
            },
            min_consensus: config.min_consensus,
            source_timeout: config.source_timeout(),
            request_delay: config.request_delay(),
            max_concurrent_sources: config.max_concurrent_sources,
            dedup_failure_limit: config.dedup_failure_limit,
            top_picks: config.top_picks,
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn PickStore>,
    adapters: Vec<Box<dyn SourceAdapter>>,
    http: HttpFetcher,
    clusterer: Box<dyn Clusterer>,
    settings: PipelineSettings,
    workspace_root: PathBuf,
    reports_dir: Option<PathBuf>,
}

impl Pipeline {
    /// Adapters run in the given order; with the greedy clusterer that order decides which
    /// group a borderline line joins.
    pub fn new(
        store: Arc<dyn PickStore>,
        adapters: Vec<Box<dyn SourceAdapter>>,
        http: HttpFetcher,
    ) -> Self {
        Self {
            store,
            adapters,
            http,
            clusterer: Box::<GreedyClusterer>::default(),
            settings: PipelineSettings::default(),
            workspace_root: PathBuf::from("."),
            reports_dir: None,
        }
    }

    pub fn with_clusterer(mut self, clusterer: Box<dyn Clusterer>) -> Self {
        self.clusterer = clusterer;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_reports_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.reports_dir = dir;
        self
    }

    /// Build a pipeline from configuration: registry adapters (enabled entries only), HTTP
    /// client, clusterer and thresholds. The store is injected.
    pub async fn from_config(config: &SyncConfig, store: Arc<dyn PickStore>) -> Result<Self> {
        let registry_path = config.resolve(&config.sources_file);
        let registry = load_source_registry(&registry_path).await?;
        let adapters = registry
            .enabled()
            .map(|source| {
                adapter_for_source(source)
                    .with_context(|| format!("building adapter for {}", source.source_id))
            })
            .collect::<Result<Vec<_>>>()?;

        let http = HttpFetcher::new(config.http_config())?;

        info!(
            sources = adapters.len(),
            clusterer = ?config.clusterer,
            backend = store.backend(),
            "pipeline configured"
        );
        Ok(Self::new(store, adapters, http)
            .with_clusterer(config.clusterer.build(config.line_tolerance))
            .with_settings(PipelineSettings::from_config(config))
            .with_workspace_root(config.workspace_root.clone())
            .with_reports_dir(config.reports_dir.as_ref().map(|d| config.resolve(d))))
    }

    pub fn store(&self) -> Arc<dyn PickStore> {
        Arc::clone(&self.store)
    }

    pub fn source_count(&self) -> usize {
        self.adapters.len()
    }

    async fn fetch_source(&self, adapter: &dyn SourceAdapter, ctx: &AdapterContext) -> SourceFetchResult {
        match tokio::time::timeout(self.settings.source_timeout, adapter.fetch(&self.http, ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    source_id = adapter.source_id(),
                    timeout = ?self.settings.source_timeout,
                    "source timed out"
                );
                SourceFetchResult::failed(
                    adapter.source_id(),
                    format!("timed out after {:?}", self.settings.source_timeout),
                )
            }
        }
    }

    /// One full pass. Source failures only shrink the input; a failed existence check on a
    /// reachable store only drops that pick. Unreachable sources or store end the run.
    pub async fn run_once(&self) -> Result<RunSummary, RunFailure> {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id)
            .instrument(info_span!("pipeline_run", %run_id))
            .await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunSummary, RunFailure> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut stats = RunStats::default();
        let mut tracker = RunTracker::start();

        macro_rules! bail {
            ($err:expr) => {{
                let error = $err;
                let failed_in = tracker.fail();
                stats.duration_ms = clock.elapsed().as_millis() as u64;
                warn!(error = %error, state = ?failed_in, "run failed");
                return Err(RunFailure {
                    run_id,
                    error,
                    failed_in,
                    stats,
                    states: tracker.visited,
                });
            }};
        }

        // FETCHING
        let ctx = AdapterContext {
            run_id,
            fetched_at: started_at,
            request_delay: self.settings.request_delay,
            workspace_root: self.workspace_root.clone(),
        };
        // futures are built up front; a lazy map over borrowed adapters is not Send
        let fetches: Vec<_> = self
            .adapters
            .iter()
            .map(|adapter| self.fetch_source(adapter.as_ref(), &ctx))
            .collect();
        let results: Vec<SourceFetchResult> = stream::iter(fetches)
            .buffered(self.settings.max_concurrent_sources.max(1))
            .collect()
            .await;
        let sources: Vec<SourceReport> = results.iter().map(SourceReport::from).collect();
        stats.sources_attempted = results.len();
        stats.sources_failed = results.iter().filter(|r| !r.success).count();
        if stats.sources_attempted > 0 && stats.sources_failed == stats.sources_attempted {
            bail!(PipelineError::NoSourcesReachable {
                attempted: stats.sources_attempted,
            });
        }
        let raw: Vec<_> = results.into_iter().flat_map(|r| r.picks).collect();
        stats.raw_picks_found = raw.len();
        info!(
            raw = stats.raw_picks_found,
            sources = stats.sources_attempted,
            failed = stats.sources_failed,
            "sources fetched"
        );

        // FILTERING
        tracker.advance();
        let filtered = filter_candidates(raw, &self.settings.filter);
        stats.after_filtering = filtered.len();
        let candidates = parse_candidates(&filtered);
        stats.parsed_candidates = candidates.len();

        // SCORING
        tracker.advance();
        let groups = self.clusterer.cluster(candidates);
        stats.groups_formed = groups.len();
        let scored = ConsensusScorer::new(self.settings.min_consensus).score(groups, Utc::now());
        stats.after_scoring = scored.len();
        info!(
            filtered = stats.after_filtering,
            candidates = stats.parsed_candidates,
            groups = stats.groups_formed,
            scored = stats.after_scoring,
            clusterer = self.clusterer.name(),
            "picks scored"
        );

        // DEDUPING
        tracker.advance();
        let dedup = Deduplicator::new(self.store.as_ref(), self.settings.dedup_failure_limit);
        let outcome = match dedup.retain_new(scored).await {
            Ok(outcome) => outcome,
            Err(err) => bail!(err),
        };
        stats.already_known = outcome.already_known;
        stats.dedup_lookup_failures = outcome.lookup_failures;
        let fresh = outcome.fresh;

        // WRITING
        tracker.advance();
        stats.write_attempted = fresh.len();
        match PersistenceWriter::new(self.store.as_ref()).write(&fresh).await {
            Ok(count) => stats.new_picks_added = count,
            Err(err) => bail!(err),
        }

        tracker.advance();
        stats.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            new = stats.new_picks_added,
            known = stats.already_known,
            duration_ms = stats.duration_ms,
            "run complete"
        );

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            stats,
            top_picks: fresh.into_iter().take(self.settings.top_picks).collect(),
            sources,
            states: tracker.visited,
        };

        if let Some(dir) = &self.reports_dir {
            if let Err(err) = write_run_report(dir, &summary).await {
                warn!(error = %err, "run report not written");
            }
        }
        Ok(summary)
    }
}

pub async fn run_once_from_env() -> Result<RunSummary> {
    let config = SyncConfig::from_env();
    let store = crate::config::open_store(&config).await?;
    let pipeline = Pipeline::from_config(&config, store).await?;
    Ok(pipeline.run_once().await?)
}
