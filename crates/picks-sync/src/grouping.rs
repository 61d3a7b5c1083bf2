//! Consensus grouping: clusters candidates that refer to the same proposition.

use std::collections::HashMap;

use picks_core::{ConsensusGroup, Operator, PickKind};

use crate::filter::Candidate;

pub const DEFAULT_LINE_TOLERANCE: f64 = 0.5;

// absorbs float noise so a 0.5 difference always counts as within 0.5
const TOLERANCE_EPSILON: f64 = 1e-9;

pub trait Clusterer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Partition `candidates` into groups. Groups come back in order of first appearance and
    /// every group has at least one member.
    fn cluster(&self, candidates: Vec<Candidate>) -> Vec<ConsensusGroup>;
}

/// Linear scan: each candidate joins the first group whose representative is the same
/// proposition with a line within `tolerance`, else opens a new group. Results depend on
/// candidate order.
#[derive(Debug, Clone, Copy)]
pub struct GreedyClusterer {
    pub tolerance: f64,
}

impl Default for GreedyClusterer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_LINE_TOLERANCE,
        }
    }
}

impl Clusterer for GreedyClusterer {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn cluster(&self, candidates: Vec<Candidate>) -> Vec<ConsensusGroup> {
        let mut groups: Vec<ConsensusGroup> = Vec::new();
        for Candidate { pick, member } in candidates {
            let slot = groups.iter().position(|group| {
                group.representative.same_proposition(&pick)
                    && (group.representative.line - pick.line).abs()
                        <= self.tolerance + TOLERANCE_EPSILON
            });
            match slot {
                Some(idx) => groups[idx].push(member),
                None => groups.push(ConsensusGroup::open(pick, member)),
            }
        }
        groups
    }
}

/// Canonical-key grouping: subject, kind, operator and a line bucket `2 * tolerance` wide.
/// Order independent, but two lines straddling a bucket edge never meet even when they are
/// closer than `tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct BucketClusterer {
    pub tolerance: f64,
}

impl Default for BucketClusterer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_LINE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    subject: String,
    kind: PickKind,
    operator: Operator,
    bucket: i64,
}

impl BucketClusterer {
    fn key(&self, candidate: &Candidate) -> BucketKey {
        let width = (self.tolerance * 2.0).max(TOLERANCE_EPSILON);
        BucketKey {
            subject: candidate.pick.subject.to_lowercase(),
            kind: candidate.pick.kind,
            operator: candidate.pick.operator,
            bucket: (candidate.pick.line / width).floor() as i64,
        }
    }
}

impl Clusterer for BucketClusterer {
    fn name(&self) -> &'static str {
        "bucket"
    }

    fn cluster(&self, candidates: Vec<Candidate>) -> Vec<ConsensusGroup> {
        let mut index: HashMap<BucketKey, usize> = HashMap::new();
        let mut groups: Vec<ConsensusGroup> = Vec::new();
        for candidate in candidates {
            let key = self.key(&candidate);
            match index.get(&key) {
                Some(&slot) => groups[slot].push(candidate.member),
                None => {
                    index.insert(key, groups.len());
                    groups.push(ConsensusGroup::open(candidate.pick, candidate.member));
                }
            }
        }
        groups
    }
}
