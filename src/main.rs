use clap::Parser;
use log::{info, warn};
use snafu::ErrorCompat;

mod args;
mod pipeline;

use crate::args::{Args, Command};

fn main() {
    let args = Args::parse();
    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    info!("Started");

    let res = match args.command {
        Command::Annotate {
            results,
            boundaries,
            out,
            config,
            district,
            reference,
        } => pipeline::run_annotate(results, boundaries, out, config, &district, reference),
        Command::Tipping {
            results,
            party,
            out,
            config,
            district,
        } => pipeline::run_tipping(results, party, out, config, &district),
    };

    if let Err(e) = res {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }

    info!("Finished");
}
