use std::io::ErrorKind;
use std::process;

use clap::Parser;
use cli::{Args, Command};
use error::{HgbError, HgbResult};
use jemallocator::Jemalloc;
use polars::error::PolarsError;
use project::Project;
use rayon::ThreadPoolBuilder;

mod address;
mod cli;
mod cluster;
mod commands;
mod config;
mod dossier;
mod error;
mod interval;
mod normalize;
mod note;
mod overlay;
mod pipeline;
mod prelude;
mod progress;
mod project;
mod record;
mod relation;
mod review;
mod table;
mod trigram;
mod utils;
mod year;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn num_threads(args: &Args) -> usize {
    if let Some(num_threads) = args.num_jobs {
        return num_threads;
    }

    if let Ok(config) = Project::discover().and_then(|p| p.config()) {
        if let Some(runtime) = config.runtime {
            if let Some(num_threads) = runtime.num_jobs {
                return num_threads;
            }
        }
    }

    0
}

fn run(args: Args) -> HgbResult<()> {
    match args.cmd {
        Command::Cluster(cmd) => cmd.execute(),
        Command::Completions(cmd) => cmd.execute(),
        Command::Config(cmd) => cmd.execute(),
        Command::Init(cmd) => cmd.execute(),
        Command::Normalize(cmd) => cmd.execute(),
        Command::Relate(cmd) => cmd.execute(),
        Command::Review(cmd) => cmd.execute(),
        Command::Summary(cmd) => cmd.execute(),
        Command::Validity(cmd) => cmd.execute(),
        Command::Years(cmd) => cmd.execute(),
    }
}

fn main() {
    let args = Args::parse();

    ThreadPoolBuilder::new()
        .num_threads(num_threads(&args))
        .build_global()
        .unwrap();

    match run(args) {
        Ok(()) => process::exit(0),
        Err(HgbError::IO(e)) if e.kind() == ErrorKind::BrokenPipe => {
            process::exit(0)
        }
        Err(HgbError::Polars(PolarsError::IO { error, .. }))
            if error.kind() == ErrorKind::BrokenPipe =>
        {
            process::exit(0);
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
