#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that feeds seeds read from a spawner, a snapshot or
//! the command line into the encounter searches and prints what they find.

mod commands;
mod config;
mod report;
mod source;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use encounter_oracle_reference_data::NameTable;
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{Command, Session},
    config::Settings,
};

#[derive(Parser, Debug)]
#[command(
    name = "encounter-oracle",
    version,
    about = "Predicts upcoming encounters from a spawner's generator state"
)]
struct Cli {
    /// TOML settings supplying defaults for omitted flags.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Personality trait names, one per line.
    #[arg(long, global = true)]
    natures: Option<PathBuf>,
    /// Prints reports as JSON.
    #[arg(long, global = true)]
    json: bool,
    /// Logs search progress to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Entry point for the encounter oracle command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let natures = match &cli.natures {
        Some(path) => NameTable::load(path)?,
        None => NameTable::default(),
    };
    let session = Session {
        settings,
        natures,
        json: cli.json,
    };
    cli.command.run(&session)
}
