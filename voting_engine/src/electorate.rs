use std::collections::HashMap;

use log::debug;

use crate::profile::{canonical, IssueStance, IssueVocabulary, ValueProfile};

/// Party label used for unaffiliated candidates in seat counts and shares.
pub const INDEPENDENT: &str = "Independent/None";

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct VoterId(pub u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CandidateId(pub u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct PartyId(pub u32);

/// One population member, immutable for the duration of an election.
#[derive(Debug, Clone)]
pub struct Voter {
    /// Scalar political bias in [0, 100].
    pub bias: f64,
    /// Scoring exponent driver in [0, 1]; high values bifurcate cardinal
    /// scores sharply.
    pub extremism: f64,
    pub stances: Vec<IssueStance>,
}

impl Voter {
    pub fn new(bias: f64, extremism: f64, stances: Vec<IssueStance>) -> Voter {
        Voter {
            bias: bias.clamp(0.0, 100.0),
            extremism: extremism.clamp(0.0, 1.0),
            stances,
        }
    }
}

/// A candidate standing in one or more contests.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub bias: f64,
    /// The candidate's personal stances, distinct from their party's.
    pub stances: Vec<IssueStance>,
    /// Party affiliation by name, resolved case-insensitively at ingestion.
    pub party: Option<String>,
    /// Restricts which regional contest the candidate is eligible for.
    pub district: Option<u32>,
}

/// A party with declared positions. Its candidate pool is derived from the
/// candidate list at ingestion, in input order.
#[derive(Debug, Clone)]
pub struct Party {
    /// Case-insensitive unique identity.
    pub name: String,
    pub bias: f64,
    pub stances: Vec<IssueStance>,
}

/// The arena: every voter, candidate and party profiled over one shared
/// vocabulary, addressed by stable dense ids assigned in input order.
///
/// Read-only for the duration of an election, so it can be shared freely
/// across workers.
#[derive(Debug)]
pub struct Electorate {
    vocab: IssueVocabulary,

    voter_profiles: Vec<ValueProfile>,
    voter_bias: Vec<f64>,
    voter_extremism: Vec<f64>,

    cand_names: Vec<String>,
    cand_profiles: Vec<ValueProfile>,
    cand_bias: Vec<f64>,
    cand_party: Vec<Option<PartyId>>,
    cand_district: Vec<Option<u32>>,

    party_names: Vec<String>,
    party_profiles: Vec<ValueProfile>,
    party_bias: Vec<f64>,
    party_pools: Vec<Vec<CandidateId>>,
}

impl Electorate {
    pub fn build(voters: &[Voter], candidates: &[Candidate], parties: &[Party]) -> Electorate {
        let all_stances = voters
            .iter()
            .flat_map(|v| v.stances.iter())
            .chain(candidates.iter().flat_map(|c| c.stances.iter()))
            .chain(parties.iter().flat_map(|p| p.stances.iter()));
        let vocab = IssueVocabulary::from_stances(all_stances);

        // Case-insensitive unique party identity: the first declaration of a
        // name wins, later duplicates are dropped.
        let mut party_key: HashMap<String, PartyId> = HashMap::new();
        let mut party_names = Vec::new();
        let mut party_profiles = Vec::new();
        let mut party_bias = Vec::new();
        for party in parties {
            let key = canonical(&party.name);
            if party_key.contains_key(&key) {
                debug!("build: duplicate party {:?} dropped", party.name);
                continue;
            }
            party_key.insert(key, PartyId(party_names.len() as u32));
            party_names.push(party.name.clone());
            party_profiles.push(ValueProfile::build(&party.stances, &vocab));
            party_bias.push(party.bias.clamp(0.0, 100.0));
        }

        let mut party_pools: Vec<Vec<CandidateId>> = vec![Vec::new(); party_names.len()];
        let mut cand_names = Vec::with_capacity(candidates.len());
        let mut cand_profiles = Vec::with_capacity(candidates.len());
        let mut cand_bias = Vec::with_capacity(candidates.len());
        let mut cand_party = Vec::with_capacity(candidates.len());
        let mut cand_district = Vec::with_capacity(candidates.len());
        for (i, cand) in candidates.iter().enumerate() {
            let pid = match &cand.party {
                Some(name) => {
                    let resolved = party_key.get(&canonical(name)).copied();
                    if resolved.is_none() {
                        debug!("build: candidate {:?} names unknown party {:?}", cand.name, name);
                    }
                    resolved
                }
                None => None,
            };
            if let Some(p) = pid {
                party_pools[p.0 as usize].push(CandidateId(i as u32));
            }
            cand_names.push(cand.name.clone());
            cand_profiles.push(ValueProfile::build(&cand.stances, &vocab));
            cand_bias.push(cand.bias.clamp(0.0, 100.0));
            cand_party.push(pid);
            cand_district.push(cand.district);
        }

        let voter_profiles = voters
            .iter()
            .map(|v| ValueProfile::build(&v.stances, &vocab))
            .collect();

        Electorate {
            vocab,
            voter_profiles,
            voter_bias: voters.iter().map(|v| v.bias.clamp(0.0, 100.0)).collect(),
            voter_extremism: voters.iter().map(|v| v.extremism.clamp(0.0, 1.0)).collect(),
            cand_names,
            cand_profiles,
            cand_bias,
            cand_party,
            cand_district,
            party_names,
            party_profiles,
            party_bias,
            party_pools,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.vocab.len()
    }

    pub fn voter_count(&self) -> usize {
        self.voter_profiles.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.cand_profiles.len()
    }

    pub fn party_count(&self) -> usize {
        self.party_profiles.len()
    }

    pub fn all_voters(&self) -> Vec<VoterId> {
        (0..self.voter_count() as u32).map(VoterId).collect()
    }

    pub fn all_candidates(&self) -> Vec<CandidateId> {
        (0..self.candidate_count() as u32).map(CandidateId).collect()
    }

    pub fn all_parties(&self) -> Vec<PartyId> {
        (0..self.party_count() as u32).map(PartyId).collect()
    }

    pub fn voter_profile(&self, v: VoterId) -> &ValueProfile {
        &self.voter_profiles[v.0 as usize]
    }

    pub fn voter_bias(&self, v: VoterId) -> f64 {
        self.voter_bias[v.0 as usize]
    }

    pub fn voter_extremism(&self, v: VoterId) -> f64 {
        self.voter_extremism[v.0 as usize]
    }

    pub fn candidate_profile(&self, c: CandidateId) -> &ValueProfile {
        &self.cand_profiles[c.0 as usize]
    }

    pub fn candidate_bias(&self, c: CandidateId) -> f64 {
        self.cand_bias[c.0 as usize]
    }

    pub fn candidate_name(&self, c: CandidateId) -> &str {
        &self.cand_names[c.0 as usize]
    }

    pub fn candidate_party(&self, c: CandidateId) -> Option<PartyId> {
        self.cand_party[c.0 as usize]
    }

    pub fn candidate_district(&self, c: CandidateId) -> Option<u32> {
        self.cand_district[c.0 as usize]
    }

    /// Party name of a candidate, or the independent label.
    pub fn candidate_party_name(&self, c: CandidateId) -> &str {
        match self.candidate_party(c) {
            Some(p) => self.party_name(p),
            None => INDEPENDENT,
        }
    }

    pub fn party_profile(&self, p: PartyId) -> &ValueProfile {
        &self.party_profiles[p.0 as usize]
    }

    pub fn party_bias(&self, p: PartyId) -> f64 {
        self.party_bias[p.0 as usize]
    }

    pub fn party_name(&self, p: PartyId) -> &str {
        &self.party_names[p.0 as usize]
    }

    /// Candidate pool of a party, in candidate input order.
    pub fn party_pool(&self, p: PartyId) -> &[CandidateId] {
        &self.party_pools[p.0 as usize]
    }

    pub fn candidates_in_district(&self, district: u32) -> Vec<CandidateId> {
        self.all_candidates()
            .into_iter()
            .filter(|&c| self.candidate_district(c) == Some(district))
            .collect()
    }
}
