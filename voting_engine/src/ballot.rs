use crate::electorate::CandidateId;

/// A ballot as consumed by the counting passes.
///
/// Ballots are derived per voter per contest from the scoring primitives
/// and never persist beyond one counting pass. Each variant carries only
/// what its counting method needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Ballot {
    /// One vote for one candidate.
    SingleChoice(CandidateId),
    /// A full preference order with an optional fractional weight, used by
    /// instant runoff (weight 1) and the multi-winner transfer pass.
    RankedList {
        prefs: Vec<CandidateId>,
        weight: f64,
    },
    /// The set of approved candidates.
    ApprovalSet(Vec<CandidateId>),
    /// Per-candidate cardinal scores.
    CardinalScores(Vec<(CandidateId, f64)>),
}

impl Ballot {
    pub fn ranked(prefs: Vec<CandidateId>) -> Ballot {
        Ballot::RankedList { prefs, weight: 1.0 }
    }

    pub fn weighted(prefs: Vec<CandidateId>, weight: f64) -> Ballot {
        Ballot::RankedList { prefs, weight }
    }

    /// The ballot's top preference, when one exists.
    pub fn first_choice(&self) -> Option<CandidateId> {
        match self {
            Ballot::SingleChoice(c) => Some(*c),
            Ballot::RankedList { prefs, .. } => prefs.first().copied(),
            Ballot::ApprovalSet(_) => None,
            Ballot::CardinalScores(scores) => scores
                .iter()
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(c, _)| *c),
        }
    }
}
