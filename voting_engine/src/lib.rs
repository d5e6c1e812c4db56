//! Compatibility scoring and election resolution for simulated
//! electorates.
//!
//! The engine profiles voters, candidates and parties over a shared issue
//! vocabulary, scores voter/target compatibility, and resolves contests
//! under plurality, strategic and national-strategic plurality, approval,
//! instant runoff, cardinal runoff, multi-winner transferable vote and
//! party-list proportional allocation. Tallying is chunked across workers
//! with an order-fixed merge, so results depend only on inputs and the
//! session seed.

mod alignment;
mod apportion;
mod ballot;
mod config;
mod electorate;
mod methods;
mod parallel;
mod profile;
mod proportional;
mod ranking;
mod transfer;
mod trend;

pub use crate::alignment::{alignment_score, best_single_issue, AlignmentCache};
pub use crate::apportion::{dhondt_allocate, hamilton_apportion};
pub use crate::ballot::Ballot;
pub use crate::config::{EngineError, EngineRules};
pub use crate::electorate::{
    Candidate, CandidateId, Electorate, Party, PartyId, Voter, VoterId, INDEPENDENT,
};
pub use crate::methods::{
    approval, cardinal_runoff, instant_runoff, instant_runoff_count, plurality, ranked_ballots,
    strategic_plurality,
};
pub use crate::parallel::{chunk_ranges, map_chunks, map_ordered, merge_tallies};
pub use crate::profile::{IssueStance, IssueVocabulary, ValueProfile};
pub use crate::proportional::{
    party_list_seats, party_votes, popular_party_shares, seat_counts, seats_popular_mse,
};
pub use crate::ranking::{
    cardinal_score, cardinal_scores_for_voter, rank_for_voter, rank_score, top_choice_for_voter,
};
pub use crate::transfer::{droop_quota, transferable_vote_count};
pub use crate::trend::{national_strategic_plurality, NationalTrendCache, TrendLeaders};

use std::collections::HashMap;

use log::info;

/// One simulation session: the electorate arena plus the session-owned
/// caches.
///
/// Caches live exactly as long as the session and are invalidated together
/// whenever the candidate or party composition changes; nothing in the
/// engine is process-global.
pub struct Simulation {
    electorate: Electorate,
    rules: EngineRules,
    cache: AlignmentCache,
    trend: NationalTrendCache,
}

impl Simulation {
    pub fn new(
        voters: &[Voter],
        candidates: &[Candidate],
        parties: &[Party],
        rules: EngineRules,
    ) -> Simulation {
        let electorate = Electorate::build(voters, candidates, parties);
        info!(
            "session: {} voters, {} candidates, {} parties over {} issues",
            electorate.voter_count(),
            electorate.candidate_count(),
            electorate.party_count(),
            electorate.issue_count()
        );
        Simulation {
            electorate,
            rules,
            cache: AlignmentCache::new(),
            trend: NationalTrendCache::new(),
        }
    }

    pub fn electorate(&self) -> &Electorate {
        &self.electorate
    }

    pub fn rules(&self) -> &EngineRules {
        &self.rules
    }

    pub fn all_voters(&self) -> Vec<VoterId> {
        self.electorate.all_voters()
    }

    pub fn all_candidates(&self) -> Vec<CandidateId> {
        self.electorate.all_candidates()
    }

    pub fn candidates_in_district(&self, district: u32) -> Vec<CandidateId> {
        self.electorate.candidates_in_district(district)
    }

    /// Drops every cached score and trend estimate. Owners call this
    /// whenever the candidate or party composition changes mid-session.
    pub fn invalidate_caches(&mut self) {
        self.cache.clear();
        self.trend.reset();
    }

    pub fn plurality(&self, candidates: &[CandidateId], voters: &[VoterId]) -> Option<CandidateId> {
        methods::plurality(&self.electorate, &self.cache, candidates, voters)
    }

    pub fn strategic_plurality(
        &self,
        candidates: &[CandidateId],
        voters: &[VoterId],
    ) -> Option<CandidateId> {
        methods::strategic_plurality(&self.electorate, &self.cache, candidates, voters)
    }

    pub fn national_strategic_plurality(
        &self,
        candidates: &[CandidateId],
        voters: &[VoterId],
    ) -> Option<CandidateId> {
        trend::national_strategic_plurality(
            &self.electorate,
            &self.cache,
            &self.trend,
            &self.rules,
            candidates,
            voters,
        )
    }

    pub fn approval(&self, candidates: &[CandidateId], voters: &[VoterId]) -> Option<CandidateId> {
        methods::approval(&self.electorate, &self.cache, &self.rules, candidates, voters)
    }

    pub fn instant_runoff(
        &self,
        candidates: &[CandidateId],
        voters: &[VoterId],
    ) -> Option<CandidateId> {
        methods::instant_runoff(&self.electorate, &self.cache, candidates, voters)
    }

    pub fn cardinal_runoff(
        &self,
        candidates: &[CandidateId],
        voters: &[VoterId],
    ) -> Option<CandidateId> {
        methods::cardinal_runoff(&self.electorate, &self.cache, &self.rules, candidates, voters)
    }

    /// Multi-winner transferable vote over one block. A slate no larger
    /// than the seat count is elected outright.
    pub fn transferable_vote(
        &self,
        candidates: &[CandidateId],
        seats: u32,
        voters: &[VoterId],
    ) -> Vec<CandidateId> {
        if candidates.is_empty() || voters.is_empty() || seats == 0 {
            return Vec::new();
        }
        if candidates.len() as u32 <= seats {
            return candidates.to_vec();
        }
        let ballots = methods::ranked_ballots(&self.electorate, &self.cache, candidates, voters);
        match transfer::transferable_vote_count(&ballots, candidates, seats, &self.rules) {
            Ok(winners) => winners,
            Err(err) => {
                log::debug!("transferable_vote: {}", err);
                Vec::new()
            }
        }
    }

    pub fn party_list_seats(&self, chamber_size: u32) -> Vec<CandidateId> {
        proportional::party_list_seats(
            &self.electorate,
            &self.cache,
            chamber_size,
            &self.all_voters(),
        )
    }

    pub fn popular_party_shares(&self) -> Vec<(String, f64)> {
        proportional::popular_party_shares(
            &self.electorate,
            &self.cache,
            &self.all_candidates(),
            &self.all_voters(),
        )
    }

    pub fn seat_counts(&self, winners: &[CandidateId]) -> HashMap<String, u32> {
        proportional::seat_counts(&self.electorate, winners)
    }

    /// Mean squared error between a seat distribution and a popular-vote
    /// share map.
    pub fn mse_vs_popular(
        &self,
        winners: &[CandidateId],
        popular: &HashMap<String, f64>,
    ) -> f64 {
        if winners.is_empty() && popular.is_empty() {
            return 0.0;
        }
        proportional::seats_popular_mse(&self.seat_counts(winners), popular)
    }
}
