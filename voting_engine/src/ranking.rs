use std::cmp::Ordering;

use crate::alignment::{alignment_score, best_single_issue, AlignmentCache};
use crate::electorate::{CandidateId, Electorate, PartyId, VoterId};

// how much raw bias similarity matters vs values/policy
const BIAS_WEIGHT: f64 = 0.60;
const VALUES_WEIGHT: f64 = 0.40;
// within values: party vs personal candidate stances
const PARTY_VS_PERSONAL: f64 = 0.70;
// a passionate single issue only sways the vote above this alignment
const SINGLE_ISSUE_FLOOR: f64 = 0.75;
const RANK_BOOST: f64 = 0.15;
const CARDINAL_BOOST: f64 = 0.20;
const CARDINAL_EXPONENT: f64 = 2.2;

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Cached voter-to-party alignment. The (voter, party) index pair is the
/// only pairing memoized session-wide, so the key space is unambiguous.
pub(crate) fn party_alignment(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
    p: PartyId,
) -> f64 {
    cache.score((v.0, p.0), || {
        alignment_score(e.voter_profile(v), e.party_profile(p))
    })
}

/// Blended bias/value score used to build a voter's preference order.
pub fn rank_score(e: &Electorate, cache: &AlignmentCache, v: VoterId, c: CandidateId) -> f64 {
    let voter_bias = e.voter_bias(v);
    let cand_bias = e.candidate_bias(c);
    let bias_sim = clamp01(1.0 - (voter_bias - cand_bias).abs() / 100.0);

    let (party_align, best_single) = match e.candidate_party(c) {
        Some(p) => (
            party_alignment(e, cache, v, p),
            best_single_issue(e.voter_profile(v), e.party_profile(p)),
        ),
        None => (0.0, 0.0),
    };
    let personal_align = alignment_score(e.voter_profile(v), e.candidate_profile(c));
    let combined =
        clamp01(party_align * PARTY_VS_PERSONAL + personal_align * (1.0 - PARTY_VS_PERSONAL));

    // values matter less the further apart the biases are
    let norm_bias_dist = (voter_bias - cand_bias).abs() / 100.0;
    let values_multiplier = 1.0 - norm_bias_dist * norm_bias_dist;

    let mut score = BIAS_WEIGHT * bias_sim + VALUES_WEIGHT * combined * values_multiplier;
    if best_single >= SINGLE_ISSUE_FLOOR && bias_sim >= 0.10 {
        score += RANK_BOOST * best_single;
    }
    score
}

/// Cardinal score in [0, 1] with exponential bias decay and a steeper value
/// exponent, used by score-based ballots.
pub fn cardinal_score(e: &Electorate, cache: &AlignmentCache, v: VoterId, c: CandidateId) -> f64 {
    let bias_diff = (e.voter_bias(v) - e.candidate_bias(c)).abs() / 100.0;
    let bias_sim = (-4.0 * bias_diff).exp();

    let (party_align, best_single) = match e.candidate_party(c) {
        Some(p) => (
            party_alignment(e, cache, v, p),
            best_single_issue(e.voter_profile(v), e.party_profile(p)),
        ),
        None => (0.0, 0.0),
    };
    let personal_align = alignment_score(e.voter_profile(v), e.candidate_profile(c));
    let combined =
        clamp01(party_align * PARTY_VS_PERSONAL + personal_align * (1.0 - PARTY_VS_PERSONAL))
            .powf(CARDINAL_EXPONENT);

    let mut score = bias_sim * combined;
    if best_single >= SINGLE_ISSUE_FLOOR && bias_sim >= 0.05 {
        score += CARDINAL_BOOST * best_single;
    }
    clamp01(score)
}

/// Deterministic preference comparison: higher score first, then closer
/// bias, then lower candidate id. Repeated runs over the same electorate
/// produce bit-identical orderings.
fn prefer(
    e: &Electorate,
    v: VoterId,
    a: (CandidateId, f64),
    b: (CandidateId, f64),
) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            let voter_bias = e.voter_bias(v);
            let da = (voter_bias - e.candidate_bias(a.0)).abs();
            let db = (voter_bias - e.candidate_bias(b.0)).abs();
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.0.cmp(&b.0))
}

/// Full preference order over `candidates` for one voter, best first.
pub fn rank_for_voter(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
    candidates: &[CandidateId],
) -> Vec<CandidateId> {
    let mut scored: Vec<(CandidateId, f64)> = candidates
        .iter()
        .map(|&c| (c, rank_score(e, cache, v, c)))
        .collect();
    scored.sort_by(|&a, &b| prefer(e, v, a, b));
    scored.into_iter().map(|(c, _)| c).collect()
}

/// Index (into `candidates`) of the voter's single most-preferred
/// candidate, without building the full order.
pub fn top_choice_for_voter(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
    candidates: &[CandidateId],
) -> Option<usize> {
    let mut best: Option<(usize, (CandidateId, f64))> = None;
    for (i, &c) in candidates.iter().enumerate() {
        let entry = (c, rank_score(e, cache, v, c));
        let replace = match best {
            Some((_, cur)) => prefer(e, v, cur, entry) == Ordering::Greater,
            None => true,
        };
        if replace {
            best = Some((i, entry));
        }
    }
    best.map(|(i, _)| i)
}

/// Cardinal scores aligned with the `candidates` slice.
pub fn cardinal_scores_for_voter(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
    candidates: &[CandidateId],
) -> Vec<f64> {
    candidates
        .iter()
        .map(|&c| cardinal_score(e, cache, v, c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electorate::{Candidate, Party, Voter};
    use crate::profile::IssueStance;

    fn stance(issue: &str, weight: f64, pos: f64) -> IssueStance {
        IssueStance::new(issue, weight, pos)
    }

    fn fixture() -> Electorate {
        let parties = vec![
            Party {
                name: "Greens".to_string(),
                bias: 30.0,
                stances: vec![stance("climate", 0.9, 8.0)],
            },
            Party {
                name: "Blues".to_string(),
                bias: 70.0,
                stances: vec![stance("climate", 0.4, -6.0)],
            },
        ];
        let candidates = vec![
            Candidate {
                name: "Gail".to_string(),
                bias: 32.0,
                stances: vec![stance("climate", 0.8, 7.0)],
                party: Some("Greens".to_string()),
                district: None,
            },
            Candidate {
                name: "Boris".to_string(),
                bias: 68.0,
                stances: vec![stance("climate", 0.3, -5.0)],
                party: Some("Blues".to_string()),
                district: None,
            },
            Candidate {
                name: "Indy".to_string(),
                bias: 30.0,
                stances: vec![],
                party: None,
                district: None,
            },
        ];
        let voters = vec![
            Voter::new(28.0, 0.2, vec![stance("climate", 1.0, 8.0)]),
            Voter::new(75.0, 0.8, vec![stance("climate", 0.6, -7.0)]),
        ];
        Electorate::build(&voters, &candidates, &parties)
    }

    #[test]
    fn green_voter_prefers_green_candidate() {
        let e = fixture();
        let cache = AlignmentCache::new();
        let order = rank_for_voter(&e, &cache, VoterId(0), &e.all_candidates());
        assert_eq!(order[0], CandidateId(0));
    }

    #[test]
    fn blue_voter_prefers_blue_candidate() {
        let e = fixture();
        let cache = AlignmentCache::new();
        let order = rank_for_voter(&e, &cache, VoterId(1), &e.all_candidates());
        assert_eq!(order[0], CandidateId(1));
    }

    #[test]
    fn top_choice_matches_full_ranking() {
        let e = fixture();
        let cache = AlignmentCache::new();
        let slate = e.all_candidates();
        for v in e.all_voters() {
            let order = rank_for_voter(&e, &cache, v, &slate);
            let top = top_choice_for_voter(&e, &cache, v, &slate).unwrap();
            assert_eq!(slate[top], order[0]);
        }
    }

    #[test]
    fn ranking_is_reproducible() {
        let e = fixture();
        let cache = AlignmentCache::new();
        let slate = e.all_candidates();
        let first = rank_for_voter(&e, &cache, VoterId(0), &slate);
        let second = rank_for_voter(&e, &cache, VoterId(0), &slate);
        assert_eq!(first, second);
    }

    #[test]
    fn cardinal_scores_stay_normalized() {
        let e = fixture();
        let cache = AlignmentCache::new();
        for v in e.all_voters() {
            for s in cardinal_scores_for_voter(&e, &cache, v, &e.all_candidates()) {
                assert!((0.0..=1.0).contains(&s));
            }
        }
    }

    #[test]
    fn rank_score_blends_party_and_personal_alignment() {
        let parties = vec![Party {
            name: "Only".to_string(),
            bias: 50.0,
            stances: vec![stance("x", 1.0, 4.0)],
        }];
        let candidates = vec![Candidate {
            name: "C".to_string(),
            bias: 50.0,
            stances: vec![stance("x", 1.0, -6.0)],
            party: Some("Only".to_string()),
            district: None,
        }];
        let voters = vec![Voter::new(50.0, 0.0, vec![stance("x", 1.0, 0.0)])];
        let e = Electorate::build(&voters, &candidates, &parties);
        let cache = AlignmentCache::new();
        // party alignment 0.8, personal 0.7, blended 0.70/0.30; bias equal
        // so the values multiplier is 1 and the single-issue boost fires
        let combined = 0.70 * 0.8 + 0.30 * 0.7;
        let expected = 0.60 * 1.0 + 0.40 * combined + 0.15 * 0.8;
        let got = rank_score(&e, &cache, VoterId(0), CandidateId(0));
        assert!((got - expected).abs() < 1e-12, "got {}", got);
    }

    #[test]
    fn independent_candidate_gets_no_party_term() {
        let e = fixture();
        let cache = AlignmentCache::new();
        // Indy shares the voter's bias but has no party or stances, so the
        // combined value term collapses to the personal share only.
        let score = rank_score(&e, &cache, VoterId(0), CandidateId(2));
        let bias_sim = 1.0 - (28.0f64 - 30.0).abs() / 100.0;
        assert!((score - 0.60 * bias_sim).abs() < 1e-12);
    }
}
