//! Shared text heuristics: pick keyword gates, mention extraction and the community confidence
//! score.

use picks_core::pick_mentions;
use scraper::Html;

/// A post must contain one of these before its numbers are read as picks.
pub const PICK_KEYWORDS: &[&str] = &[
    "pick", "picks", "lean", "liking", "bet", "bets", "play", "plays", "lock", "over", "under",
    "spread", "moneyline", "parlay", "props", "prop", "line", "fade", "follow", "riding", "taking",
];

/// Editorial feeds only count items that read like betting content.
pub const PICK_CONTENT_MARKERS: &[&str] = &["best bet", "pick", "odds", "parlay", "prediction"];

const HEDGE_WORDS: &[&str] = &["or", "fade", "loss"];

pub const BASE_COMMUNITY_CONFIDENCE: f64 = 0.75;

pub fn has_pick_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    PICK_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn is_pick_content(text: &str) -> bool {
    let lower = text.to_lowercase();
    PICK_CONTENT_MARKERS.iter().any(|k| lower.contains(k))
}

fn has_word(lower: &str, word: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

/// Engagement signals of a community post.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engagement {
    pub score: i64,
    pub comments: i64,
}

/// Confidence for one mention in a community post: a fixed base nudged up by engagement and by
/// the title naming the pick, nudged down by hedging language.
pub fn community_confidence(engagement: Engagement, title: &str, body: &str, mention: &str) -> f64 {
    let mut confidence = BASE_COMMUNITY_CONFIDENCE;
    for threshold in [50, 100, 200] {
        if engagement.score > threshold {
            confidence += 0.05;
        }
    }
    for threshold in [20, 50] {
        if engagement.comments > threshold {
            confidence += 0.05;
        }
    }

    let subject = mention_subject(mention).to_lowercase();
    if !subject.is_empty() && title.to_lowercase().contains(&subject) {
        confidence += 0.05;
    }

    let lower = format!("{title} {body}").to_lowercase();
    if HEDGE_WORDS.iter().any(|w| has_word(&lower, w)) {
        confidence -= 0.05;
    }
    confidence.clamp(0.0, 1.0)
}

/// Subject part of a mention string (`"Lakers -6.5"` → `"Lakers"`).
pub fn mention_subject(mention: &str) -> &str {
    mention
        .rsplit_once(' ')
        .map(|(subject, _)| subject)
        .unwrap_or(mention)
        .trim()
}

pub fn mention_keyword(mention: &str) -> &'static str {
    let subject = mention_subject(mention);
    if subject.eq_ignore_ascii_case("over") || subject.eq_ignore_ascii_case("under") {
        "total"
    } else {
        "team_spread"
    }
}

pub fn extract_pick_mentions(text: &str) -> Vec<String> {
    pick_mentions(text)
}

/// Plain text of an HTML fragment. Feeds often double-escape markup, so a second pass runs when
/// the first one still looks like tags.
pub fn strip_html(fragment: &str) -> String {
    let once = fragment_text(fragment);
    let text = if once.contains('<') && once.contains('>') {
        fragment_text(&once)
    } else {
        once
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fragment_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_gate() {
        assert!(has_pick_keyword("My LOCK of the day"));
        assert!(!has_pick_keyword("Game thread: Lakers at Celtics"));
    }

    #[test]
    fn engagement_and_title_raise_confidence() {
        let quiet = community_confidence(Engagement::default(), "Picks", "", "Lakers -6.5");
        assert!((quiet - 0.75).abs() < 1e-9);

        let busy = community_confidence(
            Engagement {
                score: 250,
                comments: 60,
            },
            "Lakers tonight",
            "",
            "Lakers -6.5",
        );
        assert!((busy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hedging_is_matched_as_a_word() {
        let hedged = community_confidence(Engagement::default(), "Lean", "Lakers or Celtics", "x -1");
        assert!((hedged - 0.70).abs() < 1e-9);
        // "for" and "score" contain "or" but are not hedges
        let plain = community_confidence(Engagement::default(), "Play", "going for the score", "x -1");
        assert!((plain - 0.75).abs() < 1e-9);
    }

    #[test]
    fn html_is_flattened() {
        assert_eq!(strip_html("<p>Best bet: <b>Lakers -6.5</b></p>"), "Best bet: Lakers -6.5");
        assert_eq!(strip_html("&lt;p&gt;Over 47.5&lt;/p&gt;"), "Over 47.5");
    }

    #[test]
    fn mention_helpers() {
        assert_eq!(mention_subject("Trail Blazers +4"), "Trail Blazers");
        assert_eq!(mention_keyword("over 221.5"), "total");
        assert_eq!(mention_keyword("Lakers -6.5"), "team_spread");
    }
}
