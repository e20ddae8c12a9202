#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a MANET scenario tick by tick and prints
//! the evolving topology.

mod report;
mod runner;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use log::LevelFilter;
use manet_world::query;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::scenario::Scenario;

/// Command-line arguments for the simulator.
#[derive(Debug, Parser)]
#[command(name = "manet-sim", about = "Runs a grid MANET simulation")]
struct Cli {
    /// Scenario file in TOML format; a built-in demo runs when omitted.
    scenario: Option<PathBuf>,
    /// Overrides the number of ticks from the scenario.
    #[arg(long)]
    ticks: Option<u64>,
    /// Overrides the movement seed from the scenario.
    #[arg(long)]
    seed: Option<u64>,
    /// Output format of the run report.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Increases log verbosity; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Supported report encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable frames followed by every inbox.
    Text,
    /// Full report as pretty-printed JSON.
    Json,
}

/// Entry point for the MANET simulator command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::demo(),
    };
    if let Some(ticks) = cli.ticks {
        scenario.ticks = ticks;
    }
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    scenario.warn_unreachable_messages();

    let mut rng = ChaCha8Rng::seed_from_u64(scenario.seed);
    let mut world = scenario.build_world(&mut rng)?;
    log::info!(
        "Running {} ticks with {} nodes (seed {})",
        scenario.ticks,
        query::nodes(&world).len(),
        scenario.seed
    );

    let report = runner::simulate(
        &mut world,
        &scenario.messages,
        scenario.ticks,
        scenario.seed,
        &mut rng,
    );

    match cli.format {
        OutputFormat::Text => {
            println!("{}\n", query::summary(&world));
            print!("{report}");
        }
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("failed to encode run report")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}
