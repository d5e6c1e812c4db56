use clap::Parser;
use log::info;

mod args;
mod sweep;

use crate::args::Args;

fn main() {
    let args = Args::parse();
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }
    info!("args: {:?}", args);

    if let Err(e) = sweep::run_sweep(&args) {
        eprintln!("An error occured {}", e);
        std::process::exit(1);
    }
}
