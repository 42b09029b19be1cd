#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the flood event pipeline.
//!
//! Uses `indicatif-log-bridge` (via [`flood_events_cli_utils::init_logger`])
//! so that log lines and per-stage progress bars never fight for the
//! terminal.

mod pipeline;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use flood_events_config::{PathsConfig, PipelineConfig};
use flood_events_event_models::Flag;
use strum::IntoEnumIterator;

#[derive(Parser)]
#[command(
    name = "flood_events",
    about = "Flood event disaggregation and quality-flagging pipeline"
)]
struct Cli {
    /// TOML file layered over the built-in release configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    paths: PathArgs,
    #[command(subcommand)]
    command: Commands,
}

/// File locations that override the configured `[paths]`.
#[derive(Args)]
struct PathArgs {
    /// Disaster registry CSV
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
    /// Fine-to-coarse region hierarchy CSV
    #[arg(long, global = true)]
    hierarchy: Option<PathBuf>,
    /// Disaggregated dataset CSV
    #[arg(long, global = true)]
    disaggregated: Option<PathBuf>,
    /// External metrics CSV, keyed by composite id
    #[arg(long, global = true)]
    metrics: Option<PathBuf>,
    /// Final flagged dataset CSV
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    /// Per-region summary CSV
    #[arg(long, global = true)]
    summary: Option<PathBuf>,
}

impl PathArgs {
    fn apply(self, paths: &mut PathsConfig) {
        let slots = [
            (&mut paths.registry, self.registry),
            (&mut paths.region_hierarchy, self.hierarchy),
            (&mut paths.disaggregated, self.disaggregated),
            (&mut paths.metrics, self.metrics),
            (&mut paths.output, self.output),
            (&mut paths.summary, self.summary),
        ];
        for (slot, value) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Split registry events into region-month records with composite ids
    Disaggregate,
    /// Join metrics, reinsert lost events, flag and reorder the dataset
    Postprocess,
    /// Compute per-region summary statistics from the final dataset
    Summarize,
    /// Disaggregate, postprocess and summarize in one go
    Run,
    /// Print the data-quality flag taxonomy
    Flags,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = flood_events_cli_utils::init_logger();
    let cli = Cli::parse();

    let start = Instant::now();
    match cli.command {
        Commands::Flags => {
            print_flags();
            return Ok(());
        }
        Commands::Disaggregate => {
            let config = load_config(cli.config.as_deref(), cli.paths)?;
            pipeline::disaggregate(&config, &multi)?;
        }
        Commands::Postprocess => {
            let config = load_config(cli.config.as_deref(), cli.paths)?;
            pipeline::postprocess(&config, &multi)?;
        }
        Commands::Summarize => {
            let config = load_config(cli.config.as_deref(), cli.paths)?;
            pipeline::summarize(&config)?;
        }
        Commands::Run => {
            let config = load_config(cli.config.as_deref(), cli.paths)?;
            pipeline::run(&config, &multi)?;
        }
    }
    log::info!("Finished in {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    overrides: PathArgs,
) -> Result<PipelineConfig, flood_events_config::ConfigError> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    overrides.apply(&mut config.paths);
    Ok(config)
}

fn print_flags() {
    println!("{:<6} {:<24} MEANING", "FLAG", "NAME");
    println!("{}", "-".repeat(80));
    for flag in Flag::iter() {
        let name: &str = flag.as_ref();
        println!("{:<6} {name:<24} {}", flag.code(), flag.description());
    }
}
