use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picks_core::RawPick;
use picks_storage::HttpFetcher;
use regex::Regex;
use tracing::{debug, warn};

use crate::extract::{extract_pick_mentions, is_pick_content, mention_keyword, strip_html};
use crate::{AdapterContext, AdapterError, FeedTarget, SourceAdapter, SourceKind};

pub const DEFAULT_FEED_CONFIDENCE: f64 = 0.8;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").unwrap());
static PUB_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>").unwrap());
static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(rss|channel|feed)\b").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
struct FeedItem {
    title: String,
    description: String,
    link: String,
    published: Option<String>,
}

fn unwrap_cdata(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(trimmed)
}

fn tag_text(re: &Regex, item: &str) -> Option<String> {
    re.captures(item)
        .and_then(|caps| caps.get(1))
        .map(|m| unwrap_cdata(m.as_str()).to_string())
}

fn feed_items(body: &str) -> Vec<FeedItem> {
    ITEM_RE
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let item = m.as_str();
            FeedItem {
                title: tag_text(&TITLE_RE, item).map(|t| strip_html(&t)).unwrap_or_default(),
                description: tag_text(&DESCRIPTION_RE, item)
                    .map(|d| strip_html(&d))
                    .unwrap_or_default(),
                link: tag_text(&LINK_RE, item).unwrap_or_default(),
                published: tag_text(&PUB_DATE_RE, item),
            }
        })
        .collect()
}

/// Editorial RSS feeds. Every mention inside an item carries the feed's fixed confidence.
#[derive(Debug, Clone)]
pub struct RssFeedAdapter {
    source_id: String,
    feeds: Vec<FeedTarget>,
    confidence: f64,
    require_pick_content: bool,
}

impl RssFeedAdapter {
    pub fn new(source_id: &str, feeds: Vec<FeedTarget>, confidence: f64) -> Self {
        Self {
            source_id: source_id.to_string(),
            feeds,
            confidence: confidence.clamp(0.0, 1.0),
            require_pick_content: false,
        }
    }

    /// Only read items whose title or description look like betting content.
    pub fn require_pick_content(mut self, required: bool) -> Self {
        self.require_pick_content = required;
        self
    }

    fn member_source_id(&self, feed: &FeedTarget) -> String {
        match &feed.tag {
            Some(tag) => format!("{}_{}", self.source_id, tag),
            None => self.source_id.clone(),
        }
    }

    /// Extract raw picks from one feed document.
    pub fn parse_feed(
        &self,
        feed: &FeedTarget,
        body: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<RawPick>, AdapterError> {
        if !CHANNEL_RE.is_match(body) {
            return Err(AdapterError::Malformed {
                source_id: self.member_source_id(feed),
                reason: "response is not an rss document".into(),
            });
        }

        let source_id = self.member_source_id(feed);
        let mut picks = Vec::new();
        for item in feed_items(body) {
            let full_text = format!("{} {}", item.title, item.description);
            if self.require_pick_content && !is_pick_content(&full_text) {
                continue;
            }
            let posted_at = item
                .published
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d.trim()).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or(fetched_at);

            for mention in extract_pick_mentions(&full_text) {
                let mut metadata = BTreeMap::new();
                if let Some(tag) = &feed.tag {
                    metadata.insert("feed_tag".to_string(), tag.clone());
                }
                if let Some(sport) = feed.sport {
                    metadata.insert("sport".to_string(), sport.as_str().to_string());
                }
                metadata.insert("post_title".to_string(), item.title.clone());
                metadata.insert("post_url".to_string(), item.link.trim().to_string());
                metadata.insert("keyword".to_string(), mention_keyword(&mention).to_string());

                picks.push(RawPick {
                    text: mention,
                    source_id: source_id.clone(),
                    confidence: self.confidence,
                    posted_at,
                    source_metadata: metadata,
                });
            }
        }
        Ok(picks)
    }
}

#[async_trait]
impl SourceAdapter for RssFeedAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    async fn fetch_raw(
        &self,
        http: &HttpFetcher,
        ctx: &AdapterContext,
    ) -> Result<Vec<RawPick>, AdapterError> {
        let mut picks = Vec::new();
        let mut failures = 0usize;

        for (idx, feed) in self.feeds.iter().enumerate() {
            if idx > 0 && !ctx.request_delay.is_zero() {
                tokio::time::sleep(ctx.request_delay).await;
            }
            let parsed = match http.fetch_text(&self.source_id, &feed.url).await {
                Ok(resp) => self.parse_feed(feed, &resp.body, ctx.fetched_at),
                Err(err) => Err(err.into()),
            };
            match parsed {
                Ok(found) => {
                    debug!(feed = %feed.url, picks = found.len(), "feed parsed");
                    picks.extend(found);
                }
                Err(err) => {
                    failures += 1;
                    warn!(feed = %feed.url, error = %err, "feed skipped");
                }
            }
        }

        if failures > 0 && failures == self.feeds.len() {
            return Err(AdapterError::AllTargetsFailed {
                source_id: self.source_id.clone(),
                failures,
            });
        }
        Ok(picks)
    }
}
