use std::collections::{BTreeMap, HashMap};
use std::fs;

use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use voting_engine::{CandidateId, EngineRules, Simulation, VoterId};

use crate::args::Args;

pub mod population;

use self::population::{GeneratedCountry, PopulationConfig};

/// One sweep point: a party count and each method's seats-vs-popular-vote
/// mean squared error.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    pub parties: u32,
    pub mse: BTreeMap<String, OrderedMse>,
}

/// MSE wrapper comparing by bit pattern so entries stay `Eq` for the
/// reference check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMse(pub f64);

impl PartialEq for OrderedMse {
    fn eq(&self, other: &OrderedMse) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedMse {}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub sweep: Vec<SweepEntry>,
}

#[derive(Debug, Snafu)]
pub enum SweepError {
    #[snafu(display("Error writing report to {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading reference {path}"))]
    ReadingReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingReference { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type SweepResult<T> = Result<T, SweepError>;

/// Party counts visited by the sweep: dense at the low end where method
/// behavior shifts fastest, coarser above.
fn stepped_party_counts(min: u32, max: u32) -> Vec<u32> {
    let mut counts = Vec::new();
    let mut p = min.max(2);
    while p <= max {
        counts.push(p);
        p += if p < 10 {
            1
        } else if p < 50 {
            5
        } else if p < 200 {
            25
        } else {
            50
        };
    }
    counts
}

/// Runs one single-winner method per county contest and collects winners.
fn run_per_county(
    sim: &Simulation,
    country: &GeneratedCountry,
    method: &dyn Fn(&Simulation, &[CandidateId], &[VoterId]) -> Option<CandidateId>,
) -> Vec<CandidateId> {
    let mut winners = Vec::new();
    for (ci, county) in country.counties.iter().enumerate() {
        let candidates = sim.candidates_in_district(ci as u32);
        if candidates.is_empty() || county.voters.is_empty() {
            debug!("{}: no contest", county.name);
            continue;
        }
        let voters: Vec<VoterId> = county.voters.iter().map(|&i| VoterId(i)).collect();
        if let Some(winner) = method(sim, &candidates, &voters) {
            winners.push(winner);
        }
    }
    winners
}

/// Runs the transferable vote per state block, seat counts matching each
/// state's county allocation.
fn run_transferable(sim: &Simulation, country: &GeneratedCountry) -> Vec<CandidateId> {
    let mut winners = Vec::new();
    for county_ids in &country.state_counties {
        let mut candidates = Vec::new();
        let mut voters = Vec::new();
        for &ci in county_ids {
            candidates.extend(sim.candidates_in_district(ci as u32));
            voters.extend(country.counties[ci].voters.iter().map(|&i| VoterId(i)));
        }
        if candidates.is_empty() || voters.is_empty() {
            continue;
        }
        if let Some(&first) = county_ids.first() {
            debug!(
                "{} block: {} seats, {} candidates",
                country.state_names[country.counties[first].state],
                county_ids.len(),
                candidates.len()
            );
        }
        winners.extend(sim.transferable_vote(&candidates, county_ids.len() as u32, &voters));
    }
    winners
}

/// One sweep point: a fresh country with the given party count, every
/// method run over it, each reduced to its seats-vs-popular-vote MSE.
fn sweep_point(args: &Args, parties: u32) -> SweepEntry {
    let country = population::generate(&PopulationConfig {
        seed: args.seed.wrapping_add(parties as u64),
        states: args.states,
        counties: args.counties,
        citizens: args.citizens,
        parties,
        candidates_per_county: args.candidates_per_county,
    });
    let mut rules = EngineRules::seeded(args.seed);
    rules.trend_sample_size = EngineRules::trend_sample_for_regions(country.counties.len());
    let sim = Simulation::new(&country.voters, &country.candidates, &country.parties, rules);

    let popular: HashMap<String, f64> = sim.popular_party_shares().into_iter().collect();

    let methods: Vec<(
        &str,
        Box<dyn Fn(&Simulation, &[CandidateId], &[VoterId]) -> Option<CandidateId>>,
    )> = vec![
        ("plurality", Box::new(|s, c, v| s.plurality(c, v))),
        (
            "strategic_plurality",
            Box::new(|s, c, v| s.strategic_plurality(c, v)),
        ),
        (
            "national_strategic_plurality",
            Box::new(|s, c, v| s.national_strategic_plurality(c, v)),
        ),
        ("approval", Box::new(|s, c, v| s.approval(c, v))),
        ("instant_runoff", Box::new(|s, c, v| s.instant_runoff(c, v))),
        (
            "cardinal_runoff",
            Box::new(|s, c, v| s.cardinal_runoff(c, v)),
        ),
    ];

    let mut mse: BTreeMap<String, OrderedMse> = BTreeMap::new();

    let stv_winners = run_transferable(&sim, &country);
    mse.insert(
        "transferable_vote".to_string(),
        OrderedMse(sim.mse_vs_popular(&stv_winners, &popular)),
    );

    for (name, method) in &methods {
        let winners = run_per_county(&sim, &country, method.as_ref());
        mse.insert(
            name.to_string(),
            OrderedMse(sim.mse_vs_popular(&winners, &popular)),
        );
    }

    let chamber = country.counties.len() as u32;
    let list_winners = sim.party_list_seats(chamber);
    mse.insert(
        "list_proportional".to_string(),
        OrderedMse(sim.mse_vs_popular(&list_winners, &popular)),
    );

    info!(
        "sweep: parties={} transferable_vote mse={:.6}",
        parties, mse["transferable_vote"].0
    );
    SweepEntry { parties, mse }
}

fn write_report(args: &Args, pretty: &str) -> SweepResult<()> {
    match args.out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty);
        }
        Some(path) => {
            fs::write(path, pretty).context(WritingReportSnafu {
                path: path.to_string(),
            })?;
            info!("report written to {}", path);
        }
    }
    Ok(())
}

fn check_reference(args: &Args, pretty: &str) -> SweepResult<()> {
    let path = match args.reference.as_deref() {
        Some(p) => p,
        None => return Ok(()),
    };
    let contents = fs::read_to_string(path).context(ReadingReferenceSnafu {
        path: path.to_string(),
    })?;
    let reference: JSValue = serde_json::from_str(&contents).context(ParsingReferenceSnafu)?;
    let pretty_ref =
        serde_json::to_string_pretty(&reference).context(ParsingReferenceSnafu)?;
    if pretty_ref != pretty {
        warn!("Found differences with the reference report");
        print_diff(pretty_ref.as_str(), pretty, "\n");
        whatever!("Difference detected between produced report and reference report");
    }
    Ok(())
}

/// Generates the sweep report and writes it out.
pub fn run_sweep(args: &Args) -> SweepResult<()> {
    let counts = stepped_party_counts(args.parties_min, args.parties_max);
    info!("sweep over {} party counts: {:?}", counts.len(), counts);

    let mut entries = Vec::new();
    for parties in counts {
        entries.push(sweep_point(args, parties));
    }
    let report = SweepReport { sweep: entries };
    let pretty = match serde_json::to_string_pretty(&report) {
        Ok(p) => p,
        Err(e) => whatever!("Cannot serialize report: {}", e),
    };

    write_report(args, &pretty)?;
    check_reference(args, &pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_args() -> Args {
        Args {
            seed: 7,
            states: 2,
            counties: 4,
            citizens: 200,
            candidates_per_county: 2,
            parties_min: 2,
            parties_max: 3,
            out: None,
            reference: None,
            verbose: false,
        }
    }

    #[test]
    fn stepped_counts_are_dense_then_coarse() {
        assert_eq!(stepped_party_counts(2, 6), vec![2, 3, 4, 5, 6]);
        let wide = stepped_party_counts(2, 300);
        assert!(wide.contains(&10));
        assert!(wide.contains(&50));
        assert!(wide.windows(2).all(|w| w[0] < w[1]));
        assert!(stepped_party_counts(5, 4).is_empty());
    }

    #[test]
    fn sweep_point_reports_every_method() {
        let point = sweep_point(&tiny_args(), 3);
        assert_eq!(point.parties, 3);
        for name in [
            "plurality",
            "strategic_plurality",
            "national_strategic_plurality",
            "approval",
            "instant_runoff",
            "cardinal_runoff",
            "transferable_vote",
            "list_proportional",
        ] {
            let v = point.mse.get(name).expect(name).0;
            assert!(v.is_finite() && v >= 0.0, "{} has invalid mse {}", name, v);
        }
    }

    #[test]
    fn sweep_point_is_reproducible() {
        let a = sweep_point(&tiny_args(), 2);
        let b = sweep_point(&tiny_args(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn county_contests_produce_winners() {
        let args = tiny_args();
        let country = population::generate(&PopulationConfig {
            seed: args.seed,
            states: args.states,
            counties: args.counties,
            citizens: args.citizens,
            parties: 3,
            candidates_per_county: args.candidates_per_county,
        });
        let sim = Simulation::new(
            &country.voters,
            &country.candidates,
            &country.parties,
            EngineRules::seeded(args.seed),
        );
        let winners = run_per_county(&sim, &country, &|s, c, v| s.plurality(c, v));
        assert_eq!(winners.len(), country.counties.len());
        let stv = run_transferable(&sim, &country);
        assert!(!stv.is_empty());
    }
}
