//! Free-text pick parsing. A single string can carry several picks; every spread and total
//! mention becomes its own `ParsedPick`. Text that matches nothing yields an empty vec.

use std::sync::LazyLock;

use regex::Regex;

use crate::teams::{normalize_subject, subject_as_written};
use crate::{Operator, ParsedPick, PickKind, RawPick, Sport};

// Up to three words (each containing a letter, so "76ers" passes and "2" does not) followed by
// a signed number.
static SPREAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d*[A-Za-z][\w.'&]*(?:\s+\d*[A-Za-z][\w.'&]*){0,2})\s+([+-])(\d+(?:\.\d+)?)\b",
    )
    .unwrap()
});
static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(over|under)\s+(\d+(?:\.\d+)?)\b").unwrap());

/// Signed numbers above this are moneyline prices ("Lakers -150"), not point spreads.
pub const MAX_SPREAD_LINE: f64 = 60.0;

struct SpreadMatch<'a> {
    subject: &'a str,
    sign: char,
    number: &'a str,
    line: f64,
}

fn spread_matches(text: &str) -> impl Iterator<Item = SpreadMatch<'_>> {
    SPREAD_RE.captures_iter(text).filter_map(|caps| {
        let subject = caps.get(1)?.as_str();
        let sign = caps.get(2)?.as_str().chars().next()?;
        let number = caps.get(3)?.as_str();
        let line: f64 = number.parse().ok()?;
        if line > MAX_SPREAD_LINE {
            return None;
        }
        Some(SpreadMatch {
            subject,
            sign,
            number,
            line,
        })
    })
}

fn total_matches(text: &str) -> impl Iterator<Item = (String, &str, f64)> {
    TOTAL_RE.captures_iter(text).filter_map(|caps| {
        let direction = caps.get(1)?.as_str().to_ascii_lowercase();
        let number = caps.get(2)?.as_str();
        let line: f64 = number.parse().ok()?;
        Some((direction, number, line))
    })
}

/// Raw pick strings found in a post, in the shape `"<subject> <sign><line>"` or
/// `"<over|under> <line>"`. Leading chatter is dropped but team names keep their spelling; the
/// parser normalizes them later.
pub fn pick_mentions(text: &str) -> Vec<String> {
    let mut out: Vec<String> = spread_matches(text)
        .map(|m| format!("{} {}{}", subject_as_written(m.subject, None), m.sign, m.number))
        .collect();
    out.extend(
        total_matches(text).map(|(direction, number, _)| format!("{direction} {number}")),
    );
    out
}

/// Parse every spread and total mention in `text`.
pub fn parse_pick_text(text: &str, hint: Option<Sport>) -> Vec<ParsedPick> {
    let mut picks: Vec<ParsedPick> = spread_matches(text)
        .filter_map(|m| {
            let subject = normalize_subject(m.subject, hint);
            if subject.eq_ignore_ascii_case("over") || subject.eq_ignore_ascii_case("under") {
                return None;
            }
            Some(ParsedPick {
                subject,
                operator: Operator::from_sign(m.sign),
                line: m.line,
                kind: PickKind::Spread,
            })
        })
        .collect();
    picks.extend(total_matches(text).map(|(direction, _, line)| ParsedPick {
        subject: direction,
        operator: Operator::None,
        line,
        kind: PickKind::Total,
    }));
    picks
}

pub fn parse_raw_pick(raw: &RawPick) -> Vec<ParsedPick> {
    parse_pick_text(&raw.text, raw.sport_hint())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_favorite_spread() {
        let picks = parse_pick_text("Lakers -6.5", None);
        assert_eq!(
            picks,
            vec![ParsedPick {
                subject: "Lakers".into(),
                operator: Operator::Minus,
                line: 6.5,
                kind: PickKind::Spread,
            }]
        );
    }

    #[test]
    fn parses_underdog_and_abbreviation() {
        let picks = parse_pick_text("LAL +3", None);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].subject, "Lakers");
        assert_eq!(picks[0].operator, Operator::Plus);
        assert_eq!(picks[0].line, 3.0);
    }

    #[test]
    fn parses_totals_case_insensitively() {
        let picks = parse_pick_text("OVER 47.5", None);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].subject, "over");
        assert_eq!(picks[0].operator, Operator::None);
        assert_eq!(picks[0].kind, PickKind::Total);
        assert_eq!(picks[0].line, 47.5);
    }

    #[test]
    fn emits_one_pick_per_mention() {
        let picks = parse_pick_text(
            "Tonight I like the Celtics -4.5 and Knicks +7, also under 221.5",
            None,
        );
        let shown: Vec<String> = picks.iter().map(ParsedPick::display).collect();
        assert_eq!(shown, vec!["Celtics -4.5", "Knicks +7", "under 221.5"]);
    }

    #[test]
    fn unmatched_text_yields_nothing() {
        assert!(parse_pick_text("no picks today, sorry", None).is_empty());
        assert!(parse_pick_text("went 2-1 last night", None).is_empty());
    }

    #[test]
    fn moneyline_prices_are_not_spreads() {
        assert!(parse_pick_text("Lakers -150", None).is_empty());
        let picks = parse_pick_text("Lakers -6.5 -110", None);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].line, 6.5);
    }

    #[test]
    fn mentions_keep_raw_subject_text() {
        let mentions = pick_mentions("Best bet: LAL -6.5 and Over 230");
        assert_eq!(mentions, vec!["LAL -6.5".to_string(), "over 230".to_string()]);

        let mentions = pick_mentions("my lock Lakers -6.5");
        assert_eq!(mentions, vec!["Lakers -6.5".to_string()]);
    }
}
