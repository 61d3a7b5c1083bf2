//! Core domain model for consensus picks: raw mentions, parsed propositions, consensus groups and
//! the scored records that get persisted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod parser;
pub mod teams;

pub use parser::{parse_pick_text, parse_raw_pick, pick_mentions};
pub use teams::{normalize_subject, subject_as_written, TeamDirectory, TeamEntry};

pub const CRATE_NAME: &str = "picks-core";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Nba,
    Nfl,
    Nhl,
}

impl Sport {
    pub fn as_str(self) -> &'static str {
        match self {
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Nhl => "nhl",
        }
    }

    /// Best-effort sport detection from free-form hints such as a subreddit or feed tag.
    pub fn from_hint(hint: &str) -> Option<Sport> {
        let lower = hint.to_ascii_lowercase();
        if lower.contains("nfl") || lower.contains("football") {
            Some(Sport::Nfl)
        } else if lower.contains("nba") || lower.contains("basketball") {
            Some(Sport::Nba)
        } else if lower.contains("nhl") || lower.contains("hockey") {
            Some(Sport::Nhl)
        } else {
            None
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nba" => Ok(Sport::Nba),
            "nfl" => Ok(Sport::Nfl),
            "nhl" => Ok(Sport::Nhl),
            other => Err(format!("unknown sport `{other}`")),
        }
    }
}

/// A pick string as extracted by a source adapter, before any parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPick {
    pub text: String,
    pub source_id: String,
    pub confidence: f64,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub source_metadata: BTreeMap<String, String>,
}

impl RawPick {
    /// Sport hint carried by the adapter, either explicitly or via the subreddit/feed name.
    pub fn sport_hint(&self) -> Option<Sport> {
        ["sport", "subreddit", "feed_tag"]
            .iter()
            .filter_map(|key| self.source_metadata.get(*key))
            .find_map(|value| Sport::from_hint(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Minus,
    Plus,
    None,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Minus => "-",
            Operator::Plus => "+",
            Operator::None => "",
        }
    }

    pub fn from_sign(sign: char) -> Self {
        match sign {
            '-' => Operator::Minus,
            '+' => Operator::Plus,
            _ => Operator::None,
        }
    }

    fn compatible_with(self, other: Operator) -> bool {
        self == other || self == Operator::None || other == Operator::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickKind {
    Spread,
    Total,
}

/// Structured proposition parsed out of a raw pick string. `line` is always a magnitude; the
/// sign lives in `operator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedPick {
    pub subject: String,
    pub operator: Operator,
    pub line: f64,
    pub kind: PickKind,
}

impl ParsedPick {
    /// Same underlying proposition, ignoring the exact line.
    pub fn same_proposition(&self, other: &ParsedPick) -> bool {
        self.kind == other.kind
            && self.subject.eq_ignore_ascii_case(&other.subject)
            && self.operator.compatible_with(other.operator)
    }

    pub fn display(&self) -> String {
        self.display_with_line(self.line)
    }

    pub fn display_with_line(&self, line: f64) -> String {
        format!("{} {}{}", self.subject, self.operator.symbol(), line)
    }
}

/// Deterministic pick identity: normalized subject plus the signed line.
///
/// `pick_id("Lakers", Operator::Minus, 6.0) == "lakers_-6"`
pub fn pick_id(subject: &str, operator: Operator, line: f64) -> String {
    let mut slug = String::with_capacity(subject.len());
    for ch in subject.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    format!("{}_{}{}", slug, operator.symbol(), line)
}

/// One source's contribution to a consensus group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMember {
    pub source_id: String,
    pub confidence: f64,
    pub raw_line: f64,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Cluster of parsed picks that refer to the same proposition. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusGroup {
    pub representative: ParsedPick,
    members: Vec<SourceMember>,
}

impl ConsensusGroup {
    pub fn open(representative: ParsedPick, first: SourceMember) -> Self {
        Self {
            representative,
            members: vec![first],
        }
    }

    pub fn push(&mut self, member: SourceMember) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[SourceMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_parts(self) -> (ParsedPick, Vec<SourceMember>) {
        (self.representative, self.members)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    #[default]
    Pending,
    Won,
    Lost,
}

impl PickStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PickStatus::Pending => "pending",
            PickStatus::Won => "won",
            PickStatus::Lost => "lost",
        }
    }
}

/// Persisted consensus pick. `first_seen` and `status` belong to the store once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPick {
    pub id: String,
    pub sport: Sport,
    pub kind: PickKind,
    pub subject: String,
    pub operator: Operator,
    pub display_pick: String,
    pub adjusted_pick: String,
    pub adjusted_line: f64,
    pub consensus_strength: u32,
    pub confidence_score: f64,
    pub adjustment_reason: String,
    pub line_range: LineRange,
    pub sources: Vec<SourceMember>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub status: PickStatus,
}

/// Field names the persistence layer must never overwrite on an existing document.
pub const STORE_OWNED_FIELDS: [&str; 2] = ["firstSeen", "status"];

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(subject: &str, operator: Operator, line: f64) -> ParsedPick {
        ParsedPick {
            subject: subject.into(),
            operator,
            line,
            kind: PickKind::Spread,
        }
    }

    #[test]
    fn same_proposition_ignores_line_and_case() {
        let a = spread("Lakers", Operator::Minus, 6.5);
        let b = spread("lakers", Operator::Minus, 9.0);
        assert!(a.same_proposition(&b));
    }

    #[test]
    fn opposite_operators_are_different_propositions() {
        let a = spread("Lakers", Operator::Minus, 6.5);
        let b = spread("Lakers", Operator::Plus, 6.5);
        assert!(!a.same_proposition(&b));
        let c = spread("Lakers", Operator::None, 6.5);
        assert!(a.same_proposition(&c));
    }

    #[test]
    fn kinds_must_match() {
        let a = spread("over", Operator::None, 47.5);
        let b = ParsedPick {
            kind: PickKind::Total,
            ..a.clone()
        };
        assert!(!a.same_proposition(&b));
    }

    #[test]
    fn pick_id_is_stable_and_signed() {
        assert_eq!(pick_id("Lakers", Operator::Minus, 6.0), "lakers_-6");
        assert_eq!(pick_id("  Trail Blazers ", Operator::Plus, 3.5), "trail_blazers_+3.5");
        assert_eq!(pick_id("over", Operator::None, 47.5), "over_47.5");
    }

    #[test]
    fn display_formats_whole_lines_without_decimals() {
        let pick = spread("Lakers", Operator::Minus, 6.5);
        assert_eq!(pick.display(), "Lakers -6.5");
        assert_eq!(pick.display_with_line(6.0), "Lakers -6");
    }

    #[test]
    fn sport_hint_reads_subreddit_metadata() {
        let mut metadata = BTreeMap::new();
        metadata.insert("subreddit".to_string(), "hockey".to_string());
        let raw = RawPick {
            text: "Bruins -1.5".into(),
            source_id: "reddit_hockey".into(),
            confidence: 0.8,
            posted_at: Utc::now(),
            source_metadata: metadata,
        };
        assert_eq!(raw.sport_hint(), Some(Sport::Nhl));
    }

    #[test]
    fn scored_pick_serializes_camel_case() {
        let pick = ScoredPick {
            id: "over_47.5".into(),
            sport: Sport::Nfl,
            kind: PickKind::Total,
            subject: "over".into(),
            operator: Operator::None,
            display_pick: "over 48".into(),
            adjusted_pick: "over 47.5".into(),
            adjusted_line: 47.5,
            consensus_strength: 3,
            confidence_score: 0.8,
            adjustment_reason: "Conservative adjustment: range [47.5, 48.5] → 47.5".into(),
            line_range: LineRange { min: 47.5, max: 48.5 },
            sources: vec![],
            first_seen: Utc::now(),
            last_updated: Utc::now(),
            status: PickStatus::Pending,
        };
        let value = serde_json::to_value(&pick).unwrap();
        assert_eq!(value["consensusStrength"], 3);
        assert_eq!(value["status"], "pending");
        assert!(value.get("firstSeen").is_some());
    }
}
