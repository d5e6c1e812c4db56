//! Seeded synthetic-population generation: states, counties, citizens,
//! parties and county candidate pools, shaped to feed the voting engine.

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use voting_engine::{hamilton_apportion, Candidate, IssueStance, Party, Voter};

/// Issue catalog: (name, pick weight, salience bias 0-10, average stance
/// 0-10). Pick weight drives how often citizens hold the issue at all.
const ISSUES: &[(&str, u32, f64, f64)] = &[
    ("healthcare funding", 9, 6.0, 6.0),
    ("taxation", 9, 5.0, 4.5),
    ("immigration", 8, 7.0, 5.5),
    ("climate policy", 8, 6.0, 6.5),
    ("education", 7, 4.0, 6.0),
    ("housing", 7, 5.0, 6.0),
    ("defense spending", 6, 4.0, 4.0),
    ("policing", 6, 6.0, 5.0),
    ("energy independence", 6, 4.0, 5.5),
    ("labor rights", 6, 5.0, 5.5),
    ("trade tariffs", 5, 3.0, 4.5),
    ("infrastructure", 5, 2.0, 6.5),
    ("pension reform", 5, 4.0, 4.5),
    ("agriculture subsidies", 4, 3.0, 5.0),
    ("digital privacy", 4, 3.0, 6.0),
    ("public transit", 4, 2.0, 6.0),
];

const PARTY_NAMES: &[&str] = &[
    "Concord Alliance",
    "Meridian Front",
    "Harbor League",
    "Prairie Union",
    "Summit Coalition",
    "Riverside Compact",
    "Granite Assembly",
    "Lantern Society",
    "Foundry Caucus",
    "Orchard Movement",
    "Beacon Accord",
    "Crescent Bloc",
    "Timberline Party",
    "Causeway Group",
    "Headland Circle",
    "Bastion Forum",
    "Windward Pact",
    "Juniper Order",
    "Copperline Union",
    "Vanguard Commons",
    "Estuary League",
    "Highfield Front",
    "Millbrook Society",
    "Clearwater Bloc",
    "Ironbridge Caucus",
    "Saltmarsh Alliance",
    "Kiln Valley Party",
    "Northgate Compact",
    "Amber Plains Union",
    "Seawall Coalition",
];

const STATE_NAMES: &[&str] = &[
    "Ashford", "Brinmoor", "Caldera", "Dunholm", "Eastmere", "Farrow", "Glenbrook", "Hollis",
    "Inverness", "Jutland", "Kestrel", "Larkspur", "Merribel", "Northam", "Oakhaven", "Pembroke",
];

const GIVEN_NAMES: &[&str] = &[
    "Avery", "Blake", "Casey", "Devon", "Ellis", "Finley", "Gray", "Harper", "Indigo", "Jordan",
    "Kendall", "Logan", "Morgan", "Noel", "Oakley", "Parker", "Quinn", "Reese", "Sawyer", "Tatum",
];

const FAMILY_NAMES: &[&str] = &[
    "Aldercroft", "Bexley", "Carrow", "Dunmore", "Eastvale", "Fenwick", "Galloway", "Hargrave",
    "Ivers", "Kingsley", "Lockhart", "Marchbank", "Norwood", "Ormsby", "Pemberton", "Quillfeather",
    "Ravensworth", "Stanmore", "Thorneycroft", "Underhill",
];

#[derive(Debug, Clone)]
pub struct CountyBlock {
    pub name: String,
    pub state: usize,
    /// Indices into the generated voter list.
    pub voters: Vec<u32>,
}

#[derive(Debug)]
pub struct GeneratedCountry {
    pub voters: Vec<Voter>,
    pub candidates: Vec<Candidate>,
    pub parties: Vec<Party>,
    pub counties: Vec<CountyBlock>,
    pub state_names: Vec<String>,
    /// County indices grouped per state.
    pub state_counties: Vec<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct PopulationConfig {
    pub seed: u64,
    pub states: u32,
    pub counties: u32,
    pub citizens: u32,
    pub parties: u32,
    pub candidates_per_county: u32,
}

/// Approximate standard normal draw (Irwin-Hall sum of twelve uniforms).
fn gauss(rng: &mut ChaCha8Rng) -> f64 {
    let sum: f64 = (0..12).map(|_| rng.gen::<f64>()).sum();
    sum - 6.0
}

/// Exponential-tail integer draw in [lower, upper]: small values are far
/// more likely than large ones.
fn tail_biased_between(rng: &mut ChaCha8Rng, lower: u32, upper: u32) -> u32 {
    if lower >= upper {
        return lower;
    }
    let range = (upper - lower) as f64;
    let lambda = -(1e-6f64).ln() / range;
    let u: f64 = rng.gen();
    let t = -(1.0 - u).ln() / lambda;
    (lower + t.floor() as u32).min(upper)
}

/// Older citizens drift toward the higher end of the bias scale.
fn bias_by_age(age: u32) -> f64 {
    (age as f64 - 45.0) * 0.2
}

/// Geometric-like count: most citizens hold only a few issues.
fn skewed_issue_count(rng: &mut ChaCha8Rng) -> usize {
    let mut p = 0.96;
    let mut count = 0;
    while rng.gen::<f64>() < p {
        count += 1;
        p *= 0.95;
    }
    count
}

fn pick_weighted_issue(rng: &mut ChaCha8Rng) -> usize {
    let total: u32 = ISSUES.iter().map(|i| i.1).sum();
    let mut roll = rng.gen_range(0..total);
    for (idx, issue) in ISSUES.iter().enumerate() {
        if roll < issue.1 {
            return idx;
        }
        roll -= issue.1;
    }
    ISSUES.len() - 1
}

/// Importance biased toward the middle and shifted by the issue's
/// salience; stance centered on the issue's average alignment.
fn stance_for_issue(rng: &mut ChaCha8Rng, idx: usize) -> IssueStance {
    let (name, _, salience, alignment) = ISSUES[idx];
    let base = gauss(rng) * 1.5 + 2.5;
    let weight10 = (base * 0.65 + salience * 0.35 + gauss(rng) * 0.3).clamp(0.0, 10.0);
    let mean = (alignment - 5.0) * 2.0;
    let stance = (gauss(rng) * 2.0 + mean).clamp(-10.0, 10.0);
    IssueStance::new(name, weight10 / 10.0, stance)
}

fn citizen_stances(rng: &mut ChaCha8Rng) -> Vec<IssueStance> {
    let count = skewed_issue_count(rng).min(ISSUES.len());
    let mut picked = Vec::with_capacity(count);
    let mut seen = vec![false; ISSUES.len()];
    while picked.len() < count {
        let idx = pick_weighted_issue(rng);
        if seen[idx] {
            continue;
        }
        seen[idx] = true;
        picked.push(stance_for_issue(rng, idx));
    }
    picked
}

fn generate_parties(rng: &mut ChaCha8Rng, count: u32) -> Vec<Party> {
    let mut names: Vec<&str> = PARTY_NAMES.to_vec();
    names.shuffle(rng);
    let mut parties = Vec::new();
    for i in 0..count as usize {
        // past the catalog, synthesize splinter parties
        let name = if i < names.len() {
            names[i].to_string()
        } else {
            format!("{} ({})", names[i % names.len()], i / names.len() + 1)
        };
        let bias = rng.gen_range(0.0..=100.0);
        let mut stances = Vec::new();
        for idx in 0..ISSUES.len() {
            if rng.gen::<f64>() < 0.55 {
                stances.push(stance_for_issue(rng, idx));
            }
        }
        parties.push(Party { name, bias, stances });
    }
    parties
}

fn nearest_party_name(parties: &[Party], bias: f64) -> Option<String> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in parties.iter().enumerate() {
        let dist = (p.bias - bias).abs();
        match best {
            Some((_, bd)) if dist >= bd => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| parties[i].name.clone())
}

fn random_person_name(rng: &mut ChaCha8Rng) -> String {
    let given = GIVEN_NAMES[rng.gen_range(0..GIVEN_NAMES.len())];
    let family = FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())];
    format!("{} {}", given, family)
}

/// Generates a full synthetic country from one seed.
pub fn generate(cfg: &PopulationConfig) -> GeneratedCountry {
    let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
    let state_count = cfg.states.max(1) as usize;

    let mut state_names: Vec<String> = STATE_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect();
    state_names.shuffle(&mut rng);
    while state_names.len() < state_count {
        let n = format!("{} {}", STATE_NAMES[state_names.len() % STATE_NAMES.len()], state_names.len());
        state_names.push(n);
    }
    state_names.truncate(state_count);

    // citizens, assigned uniformly to states
    let mut voters = Vec::with_capacity(cfg.citizens as usize);
    let mut ages = Vec::with_capacity(cfg.citizens as usize);
    let mut state_members: Vec<Vec<u32>> = vec![Vec::new(); state_count];
    for i in 0..cfg.citizens {
        let age = tail_biased_between(&mut rng, 16, 122);
        let bias = (rng.gen_range(0.0..=100.0) + bias_by_age(age)).clamp(0.0, 100.0);
        let extremism = (gauss(&mut rng) * 0.15 + 0.25).clamp(0.0, 1.0);
        voters.push(Voter::new(bias, extremism, citizen_stances(&mut rng)));
        ages.push(age);
        let state = rng.gen_range(0..state_count);
        state_members[state].push(i);
    }

    // counties apportioned across states by population, round-robin fill
    let regions: Vec<(String, u64)> = state_names
        .iter()
        .zip(&state_members)
        .map(|(n, m)| (n.clone(), m.len() as u64))
        .collect();
    let county_alloc = hamilton_apportion(&regions, cfg.counties.max(state_count as u32));
    let mut counties = Vec::new();
    let mut state_counties: Vec<Vec<usize>> = vec![Vec::new(); state_count];
    for (si, members) in state_members.iter().enumerate() {
        let n_counties = county_alloc[si].max(1) as usize;
        let first = counties.len();
        for k in 0..n_counties {
            counties.push(CountyBlock {
                name: format!("{} county {}", state_names[si], k + 1),
                state: si,
                voters: Vec::new(),
            });
            state_counties[si].push(first + k);
        }
        for (j, &vi) in members.iter().enumerate() {
            counties[first + j % n_counties].voters.push(vi);
        }
    }

    let parties = generate_parties(&mut rng, cfg.parties);

    // county candidate pools drawn from adult residents
    let mut candidates = Vec::new();
    for (ci, county) in counties.iter().enumerate() {
        let mut pool: Vec<u32> = county
            .voters
            .iter()
            .copied()
            .filter(|&vi| ages[vi as usize] >= 18)
            .collect();
        pool.shuffle(&mut rng);
        for &vi in pool.iter().take(cfg.candidates_per_county.max(1) as usize) {
            let voter = &voters[vi as usize];
            candidates.push(Candidate {
                name: random_person_name(&mut rng),
                bias: voter.bias,
                stances: voter.stances.clone(),
                party: nearest_party_name(&parties, voter.bias),
                district: Some(ci as u32),
            });
        }
    }
    debug!(
        "generate: {} voters, {} candidates, {} parties, {} counties",
        voters.len(),
        candidates.len(),
        parties.len(),
        counties.len()
    );

    GeneratedCountry {
        voters,
        candidates,
        parties,
        counties,
        state_names,
        state_counties,
    }
}
