// ********* Rules and error types ***********

use std::error::Error;
use std::fmt::Display;

/// Errors that prevent a counting pass from completing with a winner.
///
/// Expected control-flow outcomes (empty categories, tie-breaks, a cache
/// with nothing to report) are plain empty/`None` results, not errors.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EngineError {
    /// No candidates or no voters were supplied.
    EmptyElection,
    /// A counting round reached zero counted ballots before resolving.
    ZeroTotalCount,
    /// The transferable-vote solver hit its iteration cap before filling
    /// all seats. The caller resolves this with the fallback fill.
    NoConvergence,
}

impl Error for EngineError {}

impl Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::EmptyElection => write!(f, "empty election"),
            EngineError::ZeroTotalCount => write!(f, "zero counted ballots"),
            EngineError::NoConvergence => write!(f, "seat transfers did not converge"),
        }
    }
}

// ********* Configuration **********

/// Tunable rules for one simulation session.
///
/// Every random draw in the engine (transferable-vote elimination ties,
/// trend-cache sampling) derives from `seed`, so identical rules and
/// identical inputs reproduce identical results.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRules {
    /// Seed for all engine-side randomness.
    pub seed: u64,
    /// Normalized cardinal score above which a voter approves a candidate.
    pub approval_threshold: f64,
    /// Transformed cardinal scores below this are clipped to zero.
    pub score_floor: f64,
    /// Comparison epsilon for the cardinal runoff pass.
    pub runoff_epsilon: f64,
    /// Iteration cap for the transferable-vote solver.
    pub max_transfer_rounds: u32,
    /// Voters sampled by the national trend estimator.
    pub trend_sample_size: usize,
}

impl EngineRules {
    pub const DEFAULT: EngineRules = EngineRules {
        seed: 0,
        approval_threshold: 0.5,
        score_floor: 1e-3,
        runoff_epsilon: 1e-9,
        max_transfer_rounds: 1000,
        trend_sample_size: 5000,
    };

    pub fn seeded(seed: u64) -> EngineRules {
        EngineRules {
            seed,
            ..EngineRules::DEFAULT
        }
    }

    /// Sample size for the national trend estimator, proportional to the
    /// number of regions with a floor of 1000.
    pub fn trend_sample_for_regions(regions: usize) -> usize {
        ((regions as f64) * 0.17).round().max(1000.0) as usize
    }
}
