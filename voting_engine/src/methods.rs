use std::collections::HashMap;

use log::debug;

use crate::alignment::AlignmentCache;
use crate::ballot::Ballot;
use crate::config::{EngineError, EngineRules};
use crate::electorate::{CandidateId, Electorate, VoterId};
use crate::parallel::{map_chunks, map_ordered, merge_tallies};
use crate::ranking::{cardinal_scores_for_voter, rank_for_voter, top_choice_for_voter};

// high-extremism voters bifurcate their scores sharply
const MAX_POWER: f64 = 10.0;

/// Indices of the two largest entries. Equal values resolve to the earlier
/// index, so ties are deterministic.
pub(crate) fn top_two<T: PartialOrd + Copy>(values: &[T]) -> (Option<usize>, Option<usize>) {
    let mut first: Option<usize> = None;
    let mut second: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        match first {
            Some(f) if v <= values[f] => match second {
                Some(s) if v <= values[s] => {}
                _ => second = Some(i),
            },
            _ => {
                second = first;
                first = Some(i);
            }
        }
    }
    (first, second)
}

/// Each voter's top rank casts one vote; the highest count wins, ties going
/// to the first-seen candidate.
pub fn plurality(
    e: &Electorate,
    cache: &AlignmentCache,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let partials = map_chunks(voters.len(), |range| {
        let mut counts = vec![0u64; candidates.len()];
        for i in range {
            if let Some(top) = top_choice_for_voter(e, cache, voters[i], candidates) {
                counts[top] += 1;
            }
        }
        counts
    });
    let counts = merge_tallies(partials);
    let (winner, _) = top_two(&counts);
    winner.map(|i| candidates[i])
}

/// Two-round estimate: first-choice totals pick two leaders, then every
/// ballot is recounted for whichever leader appears first in its full
/// ranking.
pub fn strategic_plurality(
    e: &Electorate,
    cache: &AlignmentCache,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let index_of: HashMap<CandidateId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    let rankings: Vec<Vec<usize>> = map_ordered(voters.len(), |i| {
        rank_for_voter(e, cache, voters[i], candidates)
            .iter()
            .map(|c| index_of[c])
            .collect()
    });

    let mut first_counts = vec![0u64; candidates.len()];
    for ranks in &rankings {
        if let Some(&top) = ranks.first() {
            first_counts[top] += 1;
        }
    }
    let (top, second) = top_two(&first_counts);
    let top = top?;
    let second = match second {
        Some(s) => s,
        None => return Some(candidates[top]),
    };

    let partials = map_chunks(rankings.len(), |range| {
        let mut pair = vec![0u64; 2];
        for i in range {
            for &pos in &rankings[i] {
                if pos == top {
                    pair[0] += 1;
                    break;
                }
                if pos == second {
                    pair[1] += 1;
                    break;
                }
            }
        }
        pair
    });
    let pair = merge_tallies(partials);
    Some(if pair[0] >= pair[1] {
        candidates[top]
    } else {
        candidates[second]
    })
}

/// Approval with a runoff between the two most-approved candidates,
/// counting only ballots that approve exactly one of the two.
pub fn approval(
    e: &Electorate,
    cache: &AlignmentCache,
    rules: &EngineRules,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let rows: Vec<Vec<bool>> = map_ordered(voters.len(), |i| {
        cardinal_scores_for_voter(e, cache, voters[i], candidates)
            .iter()
            .map(|&s| s > rules.approval_threshold)
            .collect()
    });

    let mut totals = vec![0u64; candidates.len()];
    for row in &rows {
        for (i, &approved) in row.iter().enumerate() {
            if approved {
                totals[i] += 1;
            }
        }
    }
    let (first, second) = top_two(&totals);
    let first = first?;
    let second = match second {
        Some(s) => s,
        None => return Some(candidates[first]),
    };

    let mut first_votes = 0u64;
    let mut second_votes = 0u64;
    for row in &rows {
        match (row[first], row[second]) {
            (true, false) => first_votes += 1,
            (false, true) => second_votes += 1,
            _ => {}
        }
    }
    // tie goes to the higher-approval candidate
    Some(if first_votes >= second_votes {
        candidates[first]
    } else {
        candidates[second]
    })
}

/// Derives one full-preference ballot per voter.
pub fn ranked_ballots(
    e: &Electorate,
    cache: &AlignmentCache,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Vec<Ballot> {
    map_ordered(voters.len(), |i| {
        Ballot::ranked(rank_for_voter(e, cache, voters[i], candidates))
    })
}

/// Instant-runoff counting core: tally the first non-eliminated preference
/// of every ballot; a strict majority of counted ballots wins; otherwise
/// the lowest-tallied active candidate is eliminated and the count repeats.
///
/// Zero counted ballots in a round is fatal for the contest only and
/// surfaces as an error here, mapped to no-winner by the session.
pub fn instant_runoff_count(
    ballots: &[Ballot],
    slate: &[CandidateId],
) -> Result<CandidateId, EngineError> {
    if slate.is_empty() || ballots.is_empty() {
        return Err(EngineError::EmptyElection);
    }
    let index_of: HashMap<CandidateId, usize> = slate
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    // Compact preference lists; candidates outside the slate and ballot
    // variants without a ranking are skipped.
    let prefs: Vec<Vec<usize>> = ballots
        .iter()
        .filter_map(|b| match b {
            Ballot::RankedList { prefs, .. } => Some(
                prefs
                    .iter()
                    .filter_map(|c| index_of.get(c).copied())
                    .collect(),
            ),
            Ballot::SingleChoice(c) => index_of.get(c).map(|&i| vec![i]),
            _ => None,
        })
        .collect();

    let n = slate.len();
    let mut eliminated = vec![false; n];
    let mut remaining = n;

    while remaining > 1 {
        let mut counts = vec![0u64; n];
        let mut total = 0u64;
        for ranks in &prefs {
            for &c in ranks {
                if !eliminated[c] {
                    counts[c] += 1;
                    total += 1;
                    break;
                }
            }
        }
        if total == 0 {
            return Err(EngineError::ZeroTotalCount);
        }

        for c in 0..n {
            if !eliminated[c] && counts[c] * 2 > total {
                return Ok(slate[c]);
            }
        }

        // lowest active; equal totals resolve to the lower index
        let mut lowest: Option<usize> = None;
        let mut worst = u64::MAX;
        for c in 0..n {
            if !eliminated[c] && counts[c] < worst {
                worst = counts[c];
                lowest = Some(c);
            }
        }
        match lowest {
            Some(c) => {
                debug!("instant_runoff_count: eliminating {:?} with {} votes", slate[c], worst);
                eliminated[c] = true;
                remaining -= 1;
            }
            None => break,
        }
    }

    for (i, &c) in slate.iter().enumerate() {
        if !eliminated[i] {
            return Ok(c);
        }
    }
    Err(EngineError::ZeroTotalCount)
}

/// Instant runoff over ballots derived from each voter's full ranking.
pub fn instant_runoff(
    e: &Electorate,
    cache: &AlignmentCache,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let ballots = ranked_ballots(e, cache, candidates, voters);
    match instant_runoff_count(&ballots, candidates) {
        Ok(winner) => Some(winner),
        Err(err) => {
            debug!("instant_runoff: no winner ({})", err);
            None
        }
    }
}

fn transform_score(raw: f64, max_raw: f64, power: f64, floor: f64) -> f64 {
    if raw <= 0.0 || max_raw <= 0.0 {
        return 0.0;
    }
    let t = (raw / max_raw).powf(power);
    if t < floor {
        0.0
    } else {
        t.clamp(0.0, 1.0) * 10.0
    }
}

/// STAR-style cardinal runoff: per-voter 0-10 scores normalized against the
/// voter's own maximum, raised to `1 + extremism * 9`, clipped below the
/// score floor, summed into totals; the top two totals meet in a pairwise
/// runoff over the same transformed scores.
pub fn cardinal_runoff(
    e: &Electorate,
    cache: &AlignmentCache,
    rules: &EngineRules,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let rows: Vec<Vec<f64>> = map_ordered(voters.len(), |i| {
        let v = voters[i];
        let raw: Vec<f64> = cardinal_scores_for_voter(e, cache, v, candidates)
            .iter()
            .map(|s| s * 10.0)
            .collect();
        let max_raw = raw.iter().cloned().fold(0.0, f64::max);
        let power = 1.0 + e.voter_extremism(v) * (MAX_POWER - 1.0);
        raw.iter()
            .map(|&s| transform_score(s, max_raw, power, rules.score_floor))
            .collect()
    });

    let mut totals = vec![0.0f64; candidates.len()];
    for row in &rows {
        for (i, &t) in row.iter().enumerate() {
            totals[i] += t;
        }
    }
    let (first, second) = top_two(&totals);
    let first = first?;
    let second = match second {
        Some(s) => s,
        None => return Some(candidates[first]),
    };

    let mut first_votes = 0u64;
    let mut second_votes = 0u64;
    for row in &rows {
        let a = row[first];
        let b = row[second];
        if a > b + rules.runoff_epsilon {
            first_votes += 1;
        } else if b > a + rules.runoff_epsilon {
            second_votes += 1;
        }
    }
    // runoff tie goes to the higher-total candidate
    Some(if first_votes >= second_votes {
        candidates[first]
    } else {
        candidates[second]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electorate::{Candidate, Party, Voter};
    use crate::profile::IssueStance;

    fn cid(i: u32) -> CandidateId {
        CandidateId(i)
    }

    #[test]
    fn top_two_prefers_earlier_index_on_ties() {
        let (first, second) = top_two(&[5u64, 5, 3]);
        assert_eq!(first, Some(0));
        assert_eq!(second, Some(1));
        let (first, second) = top_two(&[1u64]);
        assert_eq!(first, Some(0));
        assert_eq!(second, None);
    }

    #[test]
    fn irv_literal_fixture_converges_in_two_rounds() {
        // 5 voters, 3 candidates, no initial majority: A=2, B=2, C=1.
        // C is eliminated, its ballot transfers to A, A reaches 3 of 5.
        let slate = vec![cid(0), cid(1), cid(2)];
        let mut ballots = vec![
            Ballot::ranked(vec![cid(0), cid(1), cid(2)]),
            Ballot::ranked(vec![cid(0), cid(2), cid(1)]),
            Ballot::ranked(vec![cid(1), cid(2), cid(0)]),
            Ballot::ranked(vec![cid(1), cid(0), cid(2)]),
            Ballot::ranked(vec![cid(2), cid(0), cid(1)]),
        ];
        assert_eq!(instant_runoff_count(&ballots, &slate), Ok(cid(0)));
        // order of ballots does not matter
        ballots.reverse();
        assert_eq!(instant_runoff_count(&ballots, &slate), Ok(cid(0)));
    }

    #[test]
    fn irv_zero_total_is_no_winner() {
        let slate = vec![cid(0), cid(1)];
        let ballots = vec![Ballot::ranked(vec![]), Ballot::ranked(vec![])];
        assert_eq!(
            instant_runoff_count(&ballots, &slate),
            Err(EngineError::ZeroTotalCount)
        );
    }

    #[test]
    fn irv_empty_inputs() {
        assert_eq!(
            instant_runoff_count(&[], &[cid(0)]),
            Err(EngineError::EmptyElection)
        );
        assert_eq!(
            instant_runoff_count(&[Ballot::ranked(vec![cid(0)])], &[]),
            Err(EngineError::EmptyElection)
        );
    }

    #[test]
    fn irv_ignores_out_of_slate_preferences() {
        let slate = vec![cid(0), cid(1)];
        let ballots = vec![
            Ballot::ranked(vec![cid(9), cid(1)]),
            Ballot::ranked(vec![cid(1)]),
            Ballot::ranked(vec![cid(0)]),
        ];
        assert_eq!(instant_runoff_count(&ballots, &slate), Ok(cid(1)));
    }

    fn stance(issue: &str, weight: f64, pos: f64) -> IssueStance {
        IssueStance::new(issue, weight, pos)
    }

    /// Two polarized parties, one candidate each, and a 3:2 voter split.
    fn polarized() -> (Electorate, Vec<CandidateId>, Vec<VoterId>) {
        let parties = vec![
            Party {
                name: "Left".to_string(),
                bias: 25.0,
                stances: vec![stance("tax", 0.9, 6.0)],
            },
            Party {
                name: "Right".to_string(),
                bias: 75.0,
                stances: vec![stance("tax", 0.9, -6.0)],
            },
        ];
        let candidates = vec![
            Candidate {
                name: "L".to_string(),
                bias: 25.0,
                stances: vec![stance("tax", 0.8, 6.0)],
                party: Some("Left".to_string()),
                district: None,
            },
            Candidate {
                name: "R".to_string(),
                bias: 75.0,
                stances: vec![stance("tax", 0.8, -6.0)],
                party: Some("Right".to_string()),
                district: None,
            },
        ];
        let voters = vec![
            Voter::new(20.0, 0.3, vec![stance("tax", 1.0, 7.0)]),
            Voter::new(30.0, 0.4, vec![stance("tax", 0.9, 5.0)]),
            Voter::new(35.0, 0.2, vec![stance("tax", 0.8, 6.0)]),
            Voter::new(70.0, 0.6, vec![stance("tax", 1.0, -7.0)]),
            Voter::new(80.0, 0.5, vec![stance("tax", 0.9, -5.0)]),
        ];
        let e = Electorate::build(&voters, &candidates, &parties);
        let cands = e.all_candidates();
        let vs = e.all_voters();
        (e, cands, vs)
    }

    #[test]
    fn polarized_majority_wins_everywhere() {
        let (e, cands, voters) = polarized();
        let cache = AlignmentCache::new();
        let rules = EngineRules::DEFAULT;
        assert_eq!(plurality(&e, &cache, &cands, &voters), Some(cid(0)));
        assert_eq!(strategic_plurality(&e, &cache, &cands, &voters), Some(cid(0)));
        assert_eq!(instant_runoff(&e, &cache, &cands, &voters), Some(cid(0)));
        assert_eq!(
            cardinal_runoff(&e, &cache, &rules, &cands, &voters),
            Some(cid(0))
        );
        assert_eq!(approval(&e, &cache, &rules, &cands, &voters), Some(cid(0)));
    }

    #[test]
    fn empty_inputs_short_circuit() {
        let (e, cands, voters) = polarized();
        let cache = AlignmentCache::new();
        let rules = EngineRules::DEFAULT;
        assert_eq!(plurality(&e, &cache, &[], &voters), None);
        assert_eq!(plurality(&e, &cache, &cands, &[]), None);
        assert_eq!(strategic_plurality(&e, &cache, &[], &voters), None);
        assert_eq!(approval(&e, &cache, &rules, &cands, &[]), None);
        assert_eq!(cardinal_runoff(&e, &cache, &rules, &[], &voters), None);
        assert_eq!(instant_runoff(&e, &cache, &cands, &[]), None);
    }

    #[test]
    fn methods_are_reproducible() {
        let (e, cands, voters) = polarized();
        let cache = AlignmentCache::new();
        let rules = EngineRules::DEFAULT;
        for _ in 0..3 {
            assert_eq!(plurality(&e, &cache, &cands, &voters), Some(cid(0)));
            assert_eq!(
                cardinal_runoff(&e, &cache, &rules, &cands, &voters),
                Some(cid(0))
            );
        }
    }

    #[test]
    fn transform_clips_below_floor() {
        assert_eq!(transform_score(0.0, 10.0, 2.0, 1e-3), 0.0);
        assert_eq!(transform_score(5.0, 0.0, 2.0, 1e-3), 0.0);
        // normalized to the voter's own max
        assert_eq!(transform_score(10.0, 10.0, 5.0, 1e-3), 10.0);
        // far below the voter's max with a sharp exponent: clipped out
        assert_eq!(transform_score(0.5, 10.0, 10.0, 1e-3), 0.0);
    }
}
