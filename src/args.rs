use clap::Parser;

/// Compares election methods over synthetic populations and reports the
/// seats-vs-popular-vote error of each method across a sweep of party
/// counts.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Master seed for population generation and all engine randomness.
    /// Identical seeds and arguments reproduce the report exactly.
    #[clap(long, value_parser, default_value_t = 42)]
    pub seed: u64,

    /// Number of states in the synthetic country.
    #[clap(long, value_parser, default_value_t = 8)]
    pub states: u32,

    /// Number of counties, apportioned across states by population.
    #[clap(long, value_parser, default_value_t = 24)]
    pub counties: u32,

    /// Number of citizens to generate.
    #[clap(long, value_parser, default_value_t = 20000)]
    pub citizens: u32,

    /// Candidates standing in each county contest.
    #[clap(long, value_parser, default_value_t = 3)]
    pub candidates_per_county: u32,

    /// Smallest party count in the sweep.
    #[clap(long, value_parser, default_value_t = 2)]
    pub parties_min: u32,

    /// Largest party count in the sweep.
    #[clap(long, value_parser, default_value_t = 12)]
    pub parties_max: u32,

    /// (file path, 'stdout' or empty) If specified, the JSON report is
    /// written to the given location instead of the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference report in JSON format. If provided, the
    /// produced report is checked against it and differences are printed.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
