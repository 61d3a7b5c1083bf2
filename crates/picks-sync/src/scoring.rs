//! Consensus scoring and conservative line adjustment.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use picks_core::{
    pick_id, ConsensusGroup, LineRange, Operator, PickKind, PickStatus, ScoredPick, SourceMember,
    Sport, TeamDirectory,
};
use picks_storage::rank_picks;
use tracing::debug;

pub const DEFAULT_MIN_CONSENSUS: usize = 2;

/// Sport assumed when neither the team directory nor source metadata says otherwise.
pub const DEFAULT_SPORT: Sport = Sport::Nba;

#[derive(Debug, Clone, Copy)]
pub struct ConsensusScorer {
    pub min_consensus: usize,
}

impl Default for ConsensusScorer {
    fn default() -> Self {
        Self {
            min_consensus: DEFAULT_MIN_CONSENSUS,
        }
    }
}

/// Pick the advertised line for a group: the one hardest to have already failed.
pub fn adjusted_line(kind: PickKind, operator: Operator, range: LineRange) -> f64 {
    match (kind, operator) {
        (PickKind::Total, _) => range.min,
        (PickKind::Spread, Operator::Minus) => range.min,
        (PickKind::Spread, Operator::Plus | Operator::None) => range.max,
    }
}

fn line_range(members: &[SourceMember]) -> Option<LineRange> {
    let first = members.first()?.raw_line;
    Some(members.iter().fold(
        LineRange {
            min: first,
            max: first,
        },
        |range, m| LineRange {
            min: range.min.min(m.raw_line),
            max: range.max.max(m.raw_line),
        },
    ))
}

fn metadata_sport(members: &[SourceMember]) -> Option<Sport> {
    members.iter().find_map(|member| {
        ["sport", "subreddit", "feed_tag"]
            .iter()
            .filter_map(|key| member.metadata.get(*key))
            .find_map(|value| Sport::from_hint(value))
    })
}

/// Team directory first, then whatever the sources said, then [`DEFAULT_SPORT`].
pub fn infer_sport(kind: PickKind, subject: &str, members: &[SourceMember]) -> Sport {
    let hint = metadata_sport(members);
    let from_team = match kind {
        PickKind::Spread => TeamDirectory::resolve(subject, hint).map(|team| team.sport),
        PickKind::Total => None,
    };
    from_team.or(hint).unwrap_or(DEFAULT_SPORT)
}

impl ConsensusScorer {
    /// A consensus needs at least two members, whatever the configured minimum.
    pub fn new(min_consensus: usize) -> Self {
        Self {
            min_consensus: min_consensus.max(DEFAULT_MIN_CONSENSUS),
        }
    }

    /// Score one group, or `None` when it lacks corroboration.
    pub fn score_group(&self, group: ConsensusGroup, now: DateTime<Utc>) -> Option<ScoredPick> {
        if group.len() < self.min_consensus {
            return None;
        }
        let (representative, members) = group.into_parts();
        let range = line_range(&members)?;
        let adjusted = adjusted_line(representative.kind, representative.operator, range);

        let mean = members.iter().map(|m| m.confidence).sum::<f64>() / members.len() as f64;
        let sport = infer_sport(representative.kind, &representative.subject, &members);

        Some(ScoredPick {
            id: pick_id(&representative.subject, representative.operator, adjusted),
            sport,
            kind: representative.kind,
            subject: representative.subject.clone(),
            operator: representative.operator,
            display_pick: representative.display(),
            adjusted_pick: representative.display_with_line(adjusted),
            adjusted_line: adjusted,
            consensus_strength: members.len() as u32,
            confidence_score: mean.min(1.0),
            adjustment_reason: format!(
                "Conservative adjustment: range [{}, {}] → {}",
                range.min, range.max, adjusted
            ),
            line_range: range,
            sources: members,
            first_seen: now,
            last_updated: now,
            status: PickStatus::Pending,
        })
    }

    /// Score all qualifying groups, ranked by consensus strength then confidence. When two
    /// groups land on the same id only the higher-ranked one is kept.
    pub fn score(&self, groups: Vec<ConsensusGroup>, now: DateTime<Utc>) -> Vec<ScoredPick> {
        let mut scored: Vec<ScoredPick> = groups
            .into_iter()
            .filter_map(|group| self.score_group(group, now))
            .collect();
        scored.sort_by(rank_picks);

        let mut seen = HashSet::new();
        scored.retain(|pick| {
            let fresh = seen.insert(pick.id.clone());
            if !fresh {
                debug!(id = %pick.id, "dropping lower-ranked group with colliding id");
            }
            fresh
        });
        scored
    }
}

pub fn score_groups(
    groups: Vec<ConsensusGroup>,
    min_consensus: usize,
    now: DateTime<Utc>,
) -> Vec<ScoredPick> {
    ConsensusScorer::new(min_consensus).score(groups, now)
}
