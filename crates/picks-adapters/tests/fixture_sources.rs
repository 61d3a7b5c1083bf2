use std::path::PathBuf;

use picks_adapters::{AdapterContext, FixtureAdapter, SourceAdapter};
use picks_storage::{HttpClientConfig, HttpFetcher};
use uuid::Uuid;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

#[tokio::test]
async fn recorded_desks_replay_their_mentions() {
    let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
    let ctx = AdapterContext::new(Uuid::new_v4(), workspace_root());

    let mut total = 0;
    for (source_id, expected) in [("desk_covers", 3), ("desk_action", 4), ("desk_community", 4)] {
        let adapter = FixtureAdapter::new(source_id, format!("fixtures/{source_id}.json"));
        let result = adapter.fetch(&http, &ctx).await;
        assert!(result.success, "{source_id}: {:?}", result.error);
        assert_eq!(result.picks.len(), expected, "{source_id}");
        total += result.picks.len();
    }
    assert_eq!(total, 11);
}

#[tokio::test]
async fn community_desk_keeps_per_subreddit_source_ids() {
    let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
    let ctx = AdapterContext::new(Uuid::new_v4(), workspace_root());
    let result = FixtureAdapter::new("desk_community", "fixtures/desk_community.json")
        .fetch(&http, &ctx)
        .await;
    let ids: Vec<&str> = result.picks.iter().map(|p| p.source_id.as_str()).collect();
    assert_eq!(ids, vec!["reddit_nba", "reddit_nfl", "reddit_nba", "reddit_hockey"]);
}
