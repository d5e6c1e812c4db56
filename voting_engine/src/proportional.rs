use std::collections::{HashMap, HashSet};

use log::debug;

use crate::alignment::AlignmentCache;
use crate::apportion::dhondt_allocate;
use crate::electorate::{CandidateId, Electorate, PartyId, VoterId, INDEPENDENT};
use crate::parallel::{map_chunks, merge_tallies};
use crate::ranking::{party_alignment, top_choice_for_voter};

/// The party a voter is most aligned with, by cached party-level
/// alignment. Equal scores resolve to the lower party id.
pub(crate) fn preferred_party(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
) -> Option<PartyId> {
    let mut best: Option<(PartyId, f64)> = None;
    for p in e.all_parties() {
        let score = party_alignment(e, cache, v, p);
        match best {
            Some((_, bs)) if score <= bs => {}
            _ => best = Some((p, score)),
        }
    }
    best.map(|(p, _)| p)
}

/// Fast-path favorite used by list-proportional counting: the preferred
/// party's first pooled candidate when the party fields one, else the
/// nearest candidate by bias. Skips the full ranking pass.
fn fast_top_candidate(e: &Electorate, cache: &AlignmentCache, v: VoterId) -> Option<CandidateId> {
    if e.candidate_count() == 0 {
        return None;
    }
    if let Some(p) = preferred_party(e, cache, v) {
        if let Some(&c) = e.party_pool(p).first() {
            return Some(c);
        }
    }
    let voter_bias = e.voter_bias(v);
    let mut best: Option<(CandidateId, f64)> = None;
    for c in e.all_candidates() {
        let dist = (voter_bias - e.candidate_bias(c)).abs();
        match best {
            Some((_, bd)) if dist >= bd => {}
            _ => best = Some((c, dist)),
        }
    }
    best.map(|(c, _)| c)
}

/// One vote per voter for the party of their fast-path favorite.
/// Independents do not accumulate list votes.
pub fn party_votes(e: &Electorate, cache: &AlignmentCache, voters: &[VoterId]) -> Vec<u64> {
    let partials = map_chunks(voters.len(), |range| {
        let mut counts = vec![0u64; e.party_count()];
        for i in range {
            if let Some(c) = fast_top_candidate(e, cache, voters[i]) {
                if let Some(p) = e.candidate_party(c) {
                    counts[p.0 as usize] += 1;
                }
            }
        }
        counts
    });
    merge_tallies(partials)
}

/// Party-list proportional seats: D'Hondt over the chamber size, awarded
/// seats filled from each party's candidate pool in pool order. A party
/// whose pool runs out forfeits the overflow.
pub fn party_list_seats(
    e: &Electorate,
    cache: &AlignmentCache,
    chamber_size: u32,
    voters: &[VoterId],
) -> Vec<CandidateId> {
    if e.candidate_count() == 0 || e.party_count() == 0 || voters.is_empty() {
        return Vec::new();
    }
    let votes = party_votes(e, cache, voters);
    let seats = dhondt_allocate(&votes, chamber_size);
    let mut winners = Vec::new();
    for (pi, &won) in seats.iter().enumerate() {
        if won == 0 {
            continue;
        }
        let pool = e.party_pool(PartyId(pi as u32));
        if (pool.len() as u32) < won {
            debug!(
                "party_list_seats: pool of {:?} exhausted at {} of {} seats",
                e.party_name(PartyId(pi as u32)),
                pool.len(),
                won
            );
        }
        winners.extend(pool.iter().take(won as usize).copied());
    }
    winners
}

/// Honest per-voter favorite over the full candidate slate, counted by
/// party and normalized to vote shares, in descending share order.
pub fn popular_party_shares(
    e: &Electorate,
    cache: &AlignmentCache,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Vec<(String, f64)> {
    if candidates.is_empty() || voters.is_empty() {
        return Vec::new();
    }
    // one slot per party plus one for independents
    let slots = e.party_count() + 1;
    let partials = map_chunks(voters.len(), |range| {
        let mut counts = vec![0u64; slots];
        for i in range {
            if let Some(top) = top_choice_for_voter(e, cache, voters[i], candidates) {
                let slot = match e.candidate_party(candidates[top]) {
                    Some(p) => p.0 as usize,
                    None => slots - 1,
                };
                counts[slot] += 1;
            }
        }
        counts
    });
    let counts = merge_tallies(partials);
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..slots).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then_with(|| a.cmp(&b)));
    order
        .into_iter()
        .filter(|&i| counts[i] > 0)
        .map(|i| {
            let name = if i == slots - 1 {
                INDEPENDENT.to_string()
            } else {
                e.party_name(PartyId(i as u32)).to_string()
            };
            (name, counts[i] as f64 / total as f64)
        })
        .collect()
}

/// Groups winners into per-party seat counts, labeling unaffiliated
/// candidates as independents.
pub fn seat_counts(e: &Electorate, winners: &[CandidateId]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for &c in winners {
        *counts
            .entry(e.candidate_party_name(c).to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Mean squared error between a seat distribution and a popular-vote share
/// map, over the union of parties appearing in either. Both empty yields
/// 0.0.
pub fn seats_popular_mse(seats: &HashMap<String, u32>, popular: &HashMap<String, f64>) -> f64 {
    if seats.is_empty() && popular.is_empty() {
        return 0.0;
    }
    let total_seats: u32 = seats.values().sum();
    let parties: HashSet<&String> = seats.keys().chain(popular.keys()).collect();
    if parties.is_empty() {
        return 0.0;
    }
    let mut sum_sq = 0.0;
    for p in &parties {
        let seat_share = if total_seats > 0 {
            *seats.get(*p).unwrap_or(&0) as f64 / total_seats as f64
        } else {
            0.0
        };
        let pop_share = *popular.get(*p).unwrap_or(&0.0);
        let diff = seat_share - pop_share;
        sum_sq += diff * diff;
    }
    sum_sq / parties.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electorate::{Candidate, Party, Voter};
    use crate::profile::IssueStance;

    fn stance(issue: &str, weight: f64, pos: f64) -> IssueStance {
        IssueStance::new(issue, weight, pos)
    }

    fn cand(name: &str, bias: f64, party: Option<&str>) -> Candidate {
        Candidate {
            name: name.to_string(),
            bias,
            stances: Vec::new(),
            party: party.map(|p| p.to_string()),
            district: None,
        }
    }

    /// Two parties with two-deep pools; voters split 3:1 between them.
    fn list_fixture() -> Electorate {
        let parties = vec![
            Party {
                name: "Alpha".to_string(),
                bias: 30.0,
                stances: vec![stance("land", 0.9, 7.0)],
            },
            Party {
                name: "Beta".to_string(),
                bias: 70.0,
                stances: vec![stance("land", 0.9, -7.0)],
            },
        ];
        let candidates = vec![
            cand("A1", 28.0, Some("Alpha")),
            cand("A2", 33.0, Some("Alpha")),
            cand("B1", 72.0, Some("Beta")),
            cand("B2", 67.0, Some("Beta")),
        ];
        let voters = vec![
            Voter::new(25.0, 0.2, vec![stance("land", 1.0, 8.0)]),
            Voter::new(30.0, 0.3, vec![stance("land", 0.8, 6.0)]),
            Voter::new(35.0, 0.4, vec![stance("land", 0.9, 7.0)]),
            Voter::new(75.0, 0.5, vec![stance("land", 1.0, -8.0)]),
        ];
        Electorate::build(&voters, &candidates, &parties)
    }

    #[test]
    fn list_seats_follow_dhondt_and_pool_order() {
        let e = list_fixture();
        let cache = AlignmentCache::new();
        // votes 3:1 over 3 seats allocate 2 Alpha, 1 Beta
        let winners = party_list_seats(&e, &cache, 3, &e.all_voters());
        assert_eq!(
            winners,
            vec![CandidateId(0), CandidateId(1), CandidateId(2)]
        );
    }

    #[test]
    fn exhausted_pool_forfeits_overflow() {
        let e = list_fixture();
        let cache = AlignmentCache::new();
        // 6 seats would award Alpha more seats than its two pooled
        // candidates; the overflow is forfeited
        let winners = party_list_seats(&e, &cache, 6, &e.all_voters());
        assert!(winners.len() < 6);
        assert!(winners.contains(&CandidateId(0)));
        assert!(winners.contains(&CandidateId(1)));
    }

    #[test]
    fn shares_sum_to_one_and_sort_descending(){
        let e = list_fixture();
        let cache = AlignmentCache::new();
        let shares =
            popular_party_shares(&e, &cache, &e.all_candidates(), &e.all_voters());
        let total: f64 = shares.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-12);
        for pair in shares.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(shares[0].0, "Alpha");
    }

    #[test]
    fn mse_of_empty_inputs_is_zero() {
        assert_eq!(seats_popular_mse(&HashMap::new(), &HashMap::new()), 0.0);
    }

    #[test]
    fn mse_of_exact_match_is_zero() {
        let mut seats = HashMap::new();
        seats.insert("Alpha".to_string(), 2u32);
        seats.insert("Beta".to_string(), 2);
        let mut popular = HashMap::new();
        popular.insert("Alpha".to_string(), 0.5);
        popular.insert("Beta".to_string(), 0.5);
        assert_eq!(seats_popular_mse(&seats, &popular), 0.0);
    }

    #[test]
    fn mse_over_party_union() {
        // a party with seats but no popular share still contributes error
        let mut seats = HashMap::new();
        seats.insert("Alpha".to_string(), 1u32);
        let mut popular = HashMap::new();
        popular.insert("Beta".to_string(), 1.0);
        // union {Alpha, Beta}: (1-0)^2 and (0-1)^2 averaged
        assert!((seats_popular_mse(&seats, &popular) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn independents_are_labeled_in_seat_counts() {
        let parties = Vec::new();
        let candidates = vec![cand("Solo", 50.0, None)];
        let voters = vec![Voter::new(50.0, 0.2, Vec::new())];
        let e = Electorate::build(&voters, &candidates, &parties);
        let counts = seat_counts(&e, &[CandidateId(0)]);
        assert_eq!(counts.get(INDEPENDENT), Some(&1));
    }
}
