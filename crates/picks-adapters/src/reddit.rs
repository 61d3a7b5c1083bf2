use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picks_core::RawPick;
use picks_storage::HttpFetcher;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::extract::{
    community_confidence, extract_pick_mentions, has_pick_keyword, mention_keyword, Engagement,
};
use crate::{AdapterContext, AdapterError, SourceAdapter, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const HOT_LIMIT: usize = 25;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    stickied: bool,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: Option<f64>,
}

/// Hot listings of a set of subreddits. Each subreddit counts as its own source
/// (`reddit_<sub>`) when consensus is tallied.
#[derive(Debug, Clone)]
pub struct RedditAdapter {
    source_id: String,
    subreddits: Vec<String>,
    base_url: String,
}

impl RedditAdapter {
    pub fn new(source_id: &str, subreddits: Vec<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            subreddits,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn listing_url(&self, subreddit: &str) -> String {
        format!("{}/r/{}/hot.json?limit={}", self.base_url, subreddit, HOT_LIMIT)
    }
}

/// Extract raw picks from one subreddit's hot listing JSON.
pub fn parse_listing(
    subreddit: &str,
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<RawPick>, AdapterError> {
    let listing: Listing = serde_json::from_str(body).map_err(|e| AdapterError::Malformed {
        source_id: format!("reddit_{subreddit}"),
        reason: e.to_string(),
    })?;

    let mut picks = Vec::new();
    for child in listing.data.children {
        let post = child.data;
        if post.stickied || post.title.trim().is_empty() {
            continue;
        }
        let full_text = format!("{} {}", post.title, post.selftext);
        if !has_pick_keyword(&full_text) {
            continue;
        }

        let posted_at = post
            .created_utc
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
            .unwrap_or(fetched_at);
        let engagement = Engagement {
            score: post.score,
            comments: post.num_comments,
        };

        for mention in extract_pick_mentions(&full_text) {
            let mut metadata = BTreeMap::new();
            metadata.insert("subreddit".to_string(), subreddit.to_string());
            metadata.insert("post_title".to_string(), post.title.clone());
            metadata.insert(
                "post_url".to_string(),
                format!("https://reddit.com{}", post.permalink),
            );
            metadata.insert("post_score".to_string(), post.score.to_string());
            metadata.insert("post_comments".to_string(), post.num_comments.to_string());
            metadata.insert("keyword".to_string(), mention_keyword(&mention).to_string());

            picks.push(RawPick {
                confidence: community_confidence(engagement, &post.title, &post.selftext, &mention),
                text: mention,
                source_id: format!("reddit_{subreddit}"),
                posted_at,
                source_metadata: metadata,
            });
        }
    }
    Ok(picks)
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    async fn fetch_raw(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Vec<RawPick>, AdapterError> {
        let mut picks = Vec::new();
        let mut failures = 0usize;

        for (idx, subreddit) in self.subreddits.iter().enumerate() {
            if idx > 0 && !ctx.request_delay.is_zero() {
                tokio::time::sleep(ctx.request_delay).await;
            }
            let url = self.listing_url(subreddit);
            let parsed = match http.fetch_text(&self.source_id, &url).await {
                Ok(resp) => parse_listing(subreddit, &resp.body, ctx.fetched_at),
                Err(err) => Err(err.into()),
            };
            match parsed {
                Ok(found) => {
                    debug!(subreddit, picks = found.len(), "subreddit parsed");
                    picks.extend(found);
                }
                Err(err) => {
                    failures += 1;
                    warn!(subreddit, error = %err, "subreddit skipped");
                }
            }
        }

        if failures > 0 && failures == self.subreddits.len() {
            return Err(AdapterError::AllTargetsFailed {
                source_id: self.source_id.clone(),
                failures,
            });
        }
        Ok(picks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().unwrap()
    }

    const LISTING: &str = r#"{
      "data": {
        "children": [
          {"data": {"title": "Daily picks thread", "selftext": "rules", "stickied": true,
                    "score": 900, "num_comments": 400, "permalink": "/r/nba/1"}},
          {"data": {"title": "Lakers tonight, my lock", "selftext": "Lakers -6.5 and over 228.5",
                    "score": 120, "num_comments": 25, "permalink": "/r/nba/2",
                    "created_utc": 1792152000.0}},
          {"data": {"title": "Trade rumors", "selftext": "Celtics +3 in the standings race",
                    "score": 10, "num_comments": 2, "permalink": "/r/nba/3"}}
        ]
      }
    }"#;

    #[test]
    fn listing_yields_mentions_from_pick_posts_only() {
        let picks = parse_listing("nba", LISTING, fetched_at()).expect("parse");
        let texts: Vec<&str> = picks.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Lakers -6.5", "over 228.5"]);
        assert!(picks.iter().all(|p| p.source_id == "reddit_nba"));
        assert_eq!(picks[0].source_metadata["post_url"], "https://reddit.com/r/nba/2");
        assert_eq!(picks[0].source_metadata["keyword"], "team_spread");
        assert_eq!(picks[1].source_metadata["keyword"], "total");
    }

    #[test]
    fn confidence_reflects_engagement_and_title() {
        let picks = parse_listing("nba", LISTING, fetched_at()).expect("parse");
        // base 0.75 + score>50 + score>100 + comments>20 + title names the team
        assert!((picks[0].confidence - 0.95).abs() < 1e-9);
        // same post, but "over" is not in the title
        assert!((picks[1].confidence - 0.90).abs() < 1e-9);
        assert_eq!(picks[0].posted_at.timestamp(), 1_792_152_000);
    }

    #[test]
    fn malformed_listing_is_an_error() {
        let err = parse_listing("nba", "<html>rate limited</html>", fetched_at()).unwrap_err();
        assert!(matches!(err, AdapterError::Malformed { .. }));
    }

    #[test]
    fn listing_url_uses_hot_endpoint() {
        let adapter = RedditAdapter::new("reddit", vec!["nba".into()])
            .with_base_url("http://127.0.0.1:9/");
        assert_eq!(
            adapter.listing_url("nba"),
            "http://127.0.0.1:9/r/nba/hot.json?limit=25"
        );
    }
}
