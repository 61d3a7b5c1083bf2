//! Candidate filter and parse stage.

use picks_core::{parse_raw_pick, ParsedPick, RawPick, SourceMember};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    pub min_confidence: f64,
    pub min_text_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            min_text_len: 3,
        }
    }
}

/// A parsed proposition together with the source member it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub pick: ParsedPick,
    pub member: SourceMember,
}

/// Drop raw picks below the confidence floor or with degenerate text. Order is preserved.
pub fn filter_candidates(raw: Vec<RawPick>, config: &FilterConfig) -> Vec<RawPick> {
    raw.into_iter()
        .filter(|pick| {
            // NaN never clears the floor
            let keep = pick.confidence >= config.min_confidence
                && pick.text.trim().chars().count() >= config.min_text_len;
            if !keep {
                debug!(source_id = %pick.source_id, text = %pick.text, "raw pick filtered");
            }
            keep
        })
        .collect()
}

/// Parse every surviving raw pick. One raw pick can yield several candidates; text matching
/// no pattern yields none.
pub fn parse_candidates(raw: &[RawPick]) -> Vec<Candidate> {
    raw.iter()
        .flat_map(|source| {
            parse_raw_pick(source).into_iter().map(move |pick| Candidate {
                member: SourceMember {
                    source_id: source.source_id.clone(),
                    confidence: source.confidence.clamp(0.0, 1.0),
                    raw_line: pick.line,
                    original_text: source.text.clone(),
                    metadata: source.source_metadata.clone(),
                },
                pick,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn raw(text: &str, confidence: f64) -> RawPick {
        RawPick {
            text: text.into(),
            source_id: "desk".into(),
            confidence,
            posted_at: Utc::now(),
            source_metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn drops_low_confidence_and_short_text() {
        let kept = filter_candidates(
            vec![
                raw("Lakers -6.5", 0.5),
                raw("Lakers -6.5", 0.49),
                raw("-6", 0.9),
                raw("Knicks +3", f64::NAN),
            ],
            &FilterConfig::default(),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.5);
    }

    #[test]
    fn one_candidate_per_mention_with_source_member() {
        let candidates = parse_candidates(&[
            raw("Celtics -4.5 and under 221.5", 0.8),
            raw("nothing to see", 0.9),
        ]);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].pick.subject, "Celtics");
        assert_eq!(candidates[0].member.raw_line, 4.5);
        assert_eq!(candidates[1].member.raw_line, 221.5);
        assert_eq!(candidates[1].member.original_text, "Celtics -4.5 and under 221.5");
    }
}
