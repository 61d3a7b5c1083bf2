//! Axum surface: pipeline trigger + pending picks read endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use picks_core::{PickKind, PickStatus, ScoredPick, Sport};
use picks_storage::{PendingQuery, PickStore};
use picks_sync::{Pipeline, RunStats};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

pub const CRATE_NAME: &str = "picks-web";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn PickStore>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let store = pipeline.store();
        Self { pipeline, store }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchAllResponse {
    success: bool,
    timestamp: DateTime<Utc>,
    stats: RunStats,
    top_picks: Vec<ScoredPick>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    success: bool,
    error: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<RunStats>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now(),
            stats: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PicksParams {
    sport: Option<String>,
    min_consensus: Option<u32>,
    limit: Option<usize>,
}

/// Pick as shown to the UI: the adjusted line is the headline, confidence is a percentage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickView {
    pub id: String,
    pub sport: Sport,
    pub pick: String,
    pub original_pick: String,
    pub consensus_strength: u32,
    pub confidence_score: u32,
    pub pick_type: PickKind,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub pick_status: PickStatus,
}

impl From<ScoredPick> for PickView {
    fn from(pick: ScoredPick) -> Self {
        Self {
            confidence_score: (pick.confidence_score * 100.0).round().clamp(0.0, 100.0) as u32,
            id: pick.id,
            sport: pick.sport,
            pick: pick.adjusted_pick,
            original_pick: pick.display_pick,
            consensus_strength: pick.consensus_strength,
            pick_type: pick.kind,
            first_seen: pick.first_seen,
            last_updated: pick.last_updated,
            pick_status: pick.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PicksResponse {
    success: bool,
    timestamp: DateTime<Utc>,
    count: usize,
    picks: Vec<PickView>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/picks/fetch-all",
            // HEAD would otherwise fall through to the GET handler and run the pipeline
            get(fetch_all_handler)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route("/api/picks", get(picks_handler).fallback(method_not_allowed))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
        .into_response()
}

async fn fetch_all_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.run_once().await {
        Ok(summary) => Json(FetchAllResponse {
            success: true,
            timestamp: Utc::now(),
            stats: summary.stats,
            top_picks: summary.top_picks,
        })
        .into_response(),
        Err(failure) => {
            error!(run_id = %failure.run_id, error = %failure.error, "triggered run failed");
            let body = ErrorResponse {
                stats: Some(failure.stats),
                ..ErrorResponse::new(failure.error.to_string())
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn pending_query(params: PicksParams) -> Result<PendingQuery, String> {
    let defaults = PendingQuery::default();
    let sport = match params.sport.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) if s.eq_ignore_ascii_case("all") => None,
        Some(s) => Some(s.parse::<Sport>()?),
    };
    Ok(PendingQuery {
        sport,
        min_consensus: params.min_consensus.unwrap_or(defaults.min_consensus),
        limit: params.limit.unwrap_or(defaults.limit),
    })
}

async fn picks_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PicksParams>,
) -> Response {
    let query = match pending_query(params) {
        Ok(query) => query,
        Err(reason) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(reason))).into_response()
        }
    };
    match state.store.query_pending(&query).await {
        Ok(picks) => {
            let picks: Vec<PickView> = picks.into_iter().map(PickView::from).collect();
            Json(PicksResponse {
                success: true,
                timestamp: Utc::now(),
                count: picks.len(),
                picks,
            })
            .into_response()
        }
        Err(err) => {
            error!(error = %err, "pending query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.to_string())),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use picks_adapters::{FixtureAdapter, SourceAdapter};
    use picks_storage::{HttpClientConfig, HttpFetcher, MemoryPickStore};
    use tower::ServiceExt;

    fn fixture_pipeline(dir: &std::path::Path, files: &[(&str, &str)]) -> Arc<Pipeline> {
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
        for (name, body) in files {
            std::fs::write(dir.join(name), body).unwrap();
            adapters.push(Box::new(FixtureAdapter::new(name.trim_end_matches(".json"), *name)));
        }
        let http = HttpFetcher::new(HttpClientConfig::default()).unwrap();
        Arc::new(
            Pipeline::new(Arc::new(MemoryPickStore::new()), adapters, http)
                .with_workspace_root(dir),
        )
    }

    fn lakers_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("covers.json", r#"{"picks": [{"text": "Lakers -6.5", "confidence": 0.8}]}"#),
            ("action.json", r#"{"picks": [{"text": "Lakers -6", "confidence": 0.75}]}"#),
            ("reddit_nba.json", r#"{"picks": [{"text": "LAL -6.5", "confidence": 0.9}]}"#),
        ]
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn fetch_all_runs_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(AppState::new(fixture_pipeline(dir.path(), &lakers_files())));

        let (status, body) = call(app.clone(), "GET", "/api/picks/fetch-all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["rawPicksFound"], 3);
        assert_eq!(body["stats"]["newPicksAdded"], 1);
        assert_eq!(body["topPicks"][0]["adjustedPick"], "Lakers -6");
        assert!(body["timestamp"].is_string());

        let (_, again) = call(app, "GET", "/api/picks/fetch-all").await;
        assert_eq!(again["stats"]["newPicksAdded"], 0);
    }

    #[tokio::test]
    async fn other_verbs_get_405_json() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(AppState::new(fixture_pipeline(dir.path(), &lakers_files())));
        let (status, body) = call(app, "POST", "/api/picks/fetch-all").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn head_does_not_trigger_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryPickStore::new());
        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
        for (name, body) in lakers_files() {
            std::fs::write(dir.path().join(name), body).unwrap();
            adapters.push(Box::new(FixtureAdapter::new(name.trim_end_matches(".json"), name)));
        }
        let http = HttpFetcher::new(HttpClientConfig::default()).unwrap();
        let pipeline = Pipeline::new(store.clone(), adapters, http).with_workspace_root(dir.path());
        let app = app(AppState::new(Arc::new(pipeline)));

        let resp = app
            .oneshot(
                axum::http::Request::builder()
                    .method("HEAD")
                    .uri("/api/picks/fetch-all")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn fatal_run_returns_500_with_stats() {
        let dir = tempfile::tempdir().unwrap();
        // fixture files are never written, so every source fails
        let http = HttpFetcher::new(HttpClientConfig::default()).unwrap();
        let adapters: Vec<Box<dyn SourceAdapter>> =
            vec![Box::new(FixtureAdapter::new("gone", "gone.json"))];
        let pipeline = Pipeline::new(Arc::new(MemoryPickStore::new()), adapters, http)
            .with_workspace_root(dir.path());
        let app = app(AppState::new(Arc::new(pipeline)));

        let (status, body) = call(app, "GET", "/api/picks/fetch-all").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("no source could be reached"));
        assert_eq!(body["stats"]["sourcesFailed"], 1);
    }

    #[tokio::test]
    async fn pending_picks_show_adjusted_line_and_percentage() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(AppState::new(fixture_pipeline(dir.path(), &lakers_files())));
        call(app.clone(), "GET", "/api/picks/fetch-all").await;

        let (status, body) = call(app.clone(), "GET", "/api/picks?sport=nba").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["picks"][0]["pick"], "Lakers -6");
        assert_eq!(body["picks"][0]["originalPick"], "Lakers -6.5");
        assert_eq!(body["picks"][0]["confidenceScore"], 82);
        assert_eq!(body["picks"][0]["pickStatus"], "pending");

        let (_, nfl) = call(app.clone(), "GET", "/api/picks?sport=nfl").await;
        assert_eq!(nfl["count"], 0);
        let (_, strict) = call(app.clone(), "GET", "/api/picks?minConsensus=4").await;
        assert_eq!(strict["count"], 0);
        let (status, _) = call(app, "GET", "/api/picks?sport=cricket").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
