use std::collections::HashMap;
use std::sync::OnceLock;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::alignment::AlignmentCache;
use crate::config::EngineRules;
use crate::electorate::{CandidateId, Electorate, PartyId, VoterId};
use crate::methods::{strategic_plurality, top_two};
use crate::parallel::{map_chunks, merge_tallies};
use crate::proportional::preferred_party;
use crate::ranking::{party_alignment, top_choice_for_voter};

/// The two nationally leading parties, as estimated from a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendLeaders {
    pub top: PartyId,
    pub second: Option<PartyId>,
}

/// Single-flight memo of the two nationally leading parties.
///
/// The first caller samples a bounded, seeded subset of the population and
/// counts each sampled voter's preferred party; concurrent callers block
/// on the in-flight computation instead of recomputing, and every caller
/// reads the same cached value until `reset`. A degenerate sample (no
/// parties, no voters, no preferences) caches `None`, which callers treat
/// as "use the district-level method", not as an error.
#[derive(Debug, Default)]
pub struct NationalTrendCache {
    cell: OnceLock<Option<TrendLeaders>>,
}

impl NationalTrendCache {
    pub fn new() -> NationalTrendCache {
        NationalTrendCache {
            cell: OnceLock::new(),
        }
    }

    /// The cached leading parties, computed at most once.
    pub fn leaders(
        &self,
        e: &Electorate,
        cache: &AlignmentCache,
        rules: &EngineRules,
    ) -> Option<TrendLeaders> {
        *self.cell.get_or_init(|| Self::compute(e, cache, rules))
    }

    fn compute(
        e: &Electorate,
        cache: &AlignmentCache,
        rules: &EngineRules,
    ) -> Option<TrendLeaders> {
        if e.party_count() == 0 || e.voter_count() == 0 {
            debug!("national trend: no parties or voters to sample");
            return None;
        }
        // sample without replacement, pinned by the session seed
        let mut pool: Vec<VoterId> = e.all_voters();
        let mut rng = ChaCha8Rng::seed_from_u64(rules.seed);
        pool.shuffle(&mut rng);
        pool.truncate(rules.trend_sample_size.min(pool.len()));

        let partials = map_chunks(pool.len(), |range| {
            let mut counts = vec![0u64; e.party_count()];
            for i in range {
                if let Some(p) = preferred_party(e, cache, pool[i]) {
                    counts[p.0 as usize] += 1;
                }
            }
            counts
        });
        let counts = merge_tallies(partials);

        let (top, second) = top_two(&counts);
        let top = top.filter(|&i| counts[i] > 0)?;
        let second = second
            .filter(|&i| counts[i] > 0)
            .map(|i| PartyId(i as u32));
        info!(
            "national trend: top {:?}, second {:?} over {} sampled voters",
            e.party_name(PartyId(top as u32)),
            second.map(|p| e.party_name(p)),
            pool.len()
        );
        Some(TrendLeaders {
            top: PartyId(top as u32),
            second,
        })
    }

    /// Forgets the cached leaders; the next caller recomputes.
    pub fn reset(&mut self) {
        self.cell = OnceLock::new();
    }
}

/// Picks between the two leading parties by alignment; equal alignment
/// favors the national leader.
fn choose_between(
    e: &Electorate,
    cache: &AlignmentCache,
    v: VoterId,
    top: PartyId,
    second: PartyId,
) -> PartyId {
    if party_alignment(e, cache, v, second) > party_alignment(e, cache, v, top) {
        second
    } else {
        top
    }
}

/// National-strategic plurality: every voter first picks between the two
/// nationally leading parties, then votes for their preferred local
/// candidate of that party when the district fields one, else falls back
/// to the district-level strategic winner. A missing or one-party trend
/// falls back to plain strategic plurality.
pub fn national_strategic_plurality(
    e: &Electorate,
    cache: &AlignmentCache,
    trend: &NationalTrendCache,
    rules: &EngineRules,
    candidates: &[CandidateId],
    voters: &[VoterId],
) -> Option<CandidateId> {
    if candidates.is_empty() || voters.is_empty() {
        return None;
    }
    let leaders = match trend.leaders(e, cache, rules) {
        Some(l) => l,
        None => {
            debug!("national_strategic_plurality: degenerate trend, using district method");
            return strategic_plurality(e, cache, candidates, voters);
        }
    };
    let second = match leaders.second {
        Some(s) => s,
        None => return strategic_plurality(e, cache, candidates, voters),
    };

    let top_locals: Vec<CandidateId> = candidates
        .iter()
        .copied()
        .filter(|&c| e.candidate_party(c) == Some(leaders.top))
        .collect();
    let second_locals: Vec<CandidateId> = candidates
        .iter()
        .copied()
        .filter(|&c| e.candidate_party(c) == Some(second))
        .collect();
    // computed once per district, not per voter
    let district_fallback = strategic_plurality(e, cache, candidates, voters);

    let index_of: HashMap<CandidateId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    let partials = map_chunks(voters.len(), |range| {
        let mut counts = vec![0u64; candidates.len()];
        for i in range {
            let v = voters[i];
            let preferred = choose_between(e, cache, v, leaders.top, second);
            let locals = if preferred == leaders.top {
                &top_locals
            } else {
                &second_locals
            };
            let chosen = top_choice_for_voter(e, cache, v, locals)
                .map(|j| locals[j])
                .or(district_fallback);
            if let Some(c) = chosen {
                if let Some(&ci) = index_of.get(&c) {
                    counts[ci] += 1;
                }
            }
        }
        counts
    });
    let counts = merge_tallies(partials);
    let (winner, _) = top_two(&counts);
    winner.filter(|&i| counts[i] > 0).map(|i| candidates[i])
}
