use std::collections::HashMap;

use log::{debug, warn};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ballot::Ballot;
use crate::config::{EngineError, EngineRules};
use crate::electorate::CandidateId;
use crate::parallel::{map_chunks, merge_tallies};

/// Vote transfer below this is treated as exhausted.
const TRANSFER_FLOOR: f64 = 1e-12;
const QUOTA_EPS: f64 = 1e-12;
const KEEP_TOL: f64 = 1e-9;

/// Droop-style quota: the minimum total required for election.
pub fn droop_quota(total_voters: usize, seats: u32) -> f64 {
    (total_voters as f64 / (seats as f64 + 1.0)).floor() + 1.0
}

/// Fractional-transfer tally: every ballot walks its preference list,
/// giving its carried transfer weight to each non-eliminated candidate and
/// keeping only the candidate's surplus fraction moving, until the weight
/// is exhausted.
fn tally(
    prefs: &[(Vec<usize>, f64)],
    eliminated: &[bool],
    keep: &[f64],
    n: usize,
) -> Vec<f64> {
    let partials = map_chunks(prefs.len(), |range| {
        let mut totals = vec![0.0f64; n];
        for bi in range {
            let (ranks, weight) = &prefs[bi];
            let mut transfer = *weight;
            for &c in ranks {
                if eliminated[c] {
                    continue;
                }
                totals[c] += transfer;
                transfer *= 1.0 - keep[c];
                if transfer < TRANSFER_FLOOR {
                    break;
                }
            }
        }
        totals
    });
    merge_tallies(partials)
}

/// Multi-winner transferable vote over one block.
///
/// Candidates start active with a keep factor of 1.0; a candidate reaching
/// quota is elected and thereafter retains `min(1, quota/total)` of any
/// vote received. When an iteration changes nothing, either enough seats
/// are filled, the remaining active candidates are elected outright, or
/// the lowest-tallied active candidate is eliminated (equal totals are
/// resolved by one seeded draw among the tied set only). The iteration cap
/// guards against non-convergence; hitting it fills the remaining seats by
/// highest final fractional total.
///
/// The elected set is unordered beyond the fact of election.
pub fn transferable_vote_count(
    ballots: &[Ballot],
    slate: &[CandidateId],
    seats: u32,
    rules: &EngineRules,
) -> Result<Vec<CandidateId>, EngineError> {
    if slate.is_empty() || ballots.is_empty() || seats == 0 {
        return Err(EngineError::EmptyElection);
    }
    if slate.len() as u32 <= seats {
        return Ok(slate.to_vec());
    }

    let index_of: HashMap<CandidateId, usize> = slate
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i))
        .collect();
    let prefs: Vec<(Vec<usize>, f64)> = ballots
        .iter()
        .filter_map(|b| match b {
            Ballot::RankedList { prefs, weight } => Some((
                prefs
                    .iter()
                    .filter_map(|c| index_of.get(c).copied())
                    .collect(),
                *weight,
            )),
            Ballot::SingleChoice(c) => index_of.get(c).map(|&i| (vec![i], 1.0)),
            _ => None,
        })
        .collect();

    let n = slate.len();
    let quota = droop_quota(ballots.len(), seats);
    debug!("transferable_vote_count: {} seats, quota {}", seats, quota);

    let mut eliminated = vec![false; n];
    let mut elected = vec![false; n];
    let mut keep = vec![1.0f64; n];
    let mut rng = ChaCha8Rng::seed_from_u64(rules.seed);
    let mut converged = false;

    for iter in 0..rules.max_transfer_rounds {
        let totals = tally(&prefs, &eliminated, &keep, n);

        let mut any_change = false;
        for i in 0..n {
            if !eliminated[i] && !elected[i] && totals[i] >= quota - QUOTA_EPS {
                debug!("transferable_vote_count: iter {} elects {:?}", iter, slate[i]);
                elected[i] = true;
                any_change = true;
            }
        }

        // Gregory-style fractional surplus retention.
        for i in 0..n {
            if !elected[i] {
                continue;
            }
            let new_keep = if totals[i] > 0.0 {
                (quota / totals[i]).min(1.0)
            } else {
                0.0
            };
            if (new_keep - keep[i]).abs() > KEEP_TOL {
                any_change = true;
            }
            keep[i] = new_keep;
        }

        if any_change {
            continue;
        }

        let elected_count = elected.iter().filter(|&&b| b).count() as u32;
        let active_count = (0..n).filter(|&i| !eliminated[i] && !elected[i]).count() as u32;
        if elected_count >= seats {
            converged = true;
            break;
        }
        if active_count <= seats - elected_count {
            for i in 0..n {
                if !eliminated[i] && !elected[i] {
                    elected[i] = true;
                }
            }
            converged = true;
            break;
        }

        let mut min_total = f64::MAX;
        for i in 0..n {
            if !eliminated[i] && !elected[i] && totals[i] < min_total {
                min_total = totals[i];
            }
        }
        let tied: Vec<usize> = (0..n)
            .filter(|&i| !eliminated[i] && !elected[i] && totals[i] <= min_total)
            .collect();
        let pick = if tied.len() == 1 {
            tied[0]
        } else {
            tied[rng.gen_range(0..tied.len())]
        };
        debug!(
            "transferable_vote_count: iter {} eliminates {:?} ({} tied at {})",
            iter,
            slate[pick],
            tied.len(),
            min_total
        );
        eliminated[pick] = true;
        keep[pick] = 0.0;
    }

    let mut elected_count = elected.iter().filter(|&&b| b).count() as u32;
    if elected_count < seats {
        if !converged {
            warn!(
                "transferable_vote_count: {}, filling {} remaining seats by final totals",
                EngineError::NoConvergence,
                seats - elected_count
            );
        }
        let totals = tally(&prefs, &eliminated, &keep, n);
        let mut remaining: Vec<usize> = (0..n)
            .filter(|&i| !eliminated[i] && !elected[i])
            .collect();
        remaining.sort_by(|&a, &b| {
            totals[b]
                .partial_cmp(&totals[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        for i in remaining {
            if elected_count >= seats {
                break;
            }
            elected[i] = true;
            elected_count += 1;
        }
    }

    Ok((0..n).filter(|&i| elected[i]).map(|i| slate[i]).collect())
}
