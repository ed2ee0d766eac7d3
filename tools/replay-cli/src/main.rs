//! bsreplay - inspect, look up and simulate rhythm-game replays
//!
//! # Commands
//!
//! - `bsreplay inspect <file>` - Print header metadata and timeline sizes
//! - `bsreplay list` - Find the replays recorded for a beatmap
//! - `bsreplay preview <file> --time <t>` - Score and pose at one song time
//! - `bsreplay simulate <file>` - Play a replay headlessly to the end
//!
//! # Usage
//!
//! ```bash
//! bsreplay inspect 7656-Player-ExpertPlus-Standard-ABCDEF.bsor --json
//! bsreplay list --level-id custom_level_ABCDEF --difficulty ExpertPlus \
//!     --characteristic Standard --dir bsor=~/replays
//! bsreplay simulate replay.dat --step 0.011
//! ```
//!
//! Replay directories default to `config.toml` in the platform config
//! directory; `RUST_LOG` controls log output.

mod inspect;
mod list;
mod preview;
mod simulate;

use anyhow::{Context, Result};
use bsreplay_core::{Config, ReplayWrapper, config};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// bsreplay - replay inspection and headless playback
#[derive(Parser)]
#[command(name = "bsreplay")]
#[command(about = "Inspect and simulate rhythm-game replays")]
#[command(version)]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print header metadata and timeline sizes
    Inspect(inspect::InspectArgs),

    /// Find the replays recorded for a beatmap
    List(list::ListArgs),

    /// Score and pose at one song time
    Preview(preview::PreviewArgs),

    /// Play a replay headlessly to the end
    Simulate(simulate::SimulateArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => config::load(),
    };
    tracing::debug!("playback config: {:?}", config.playback);

    match cli.command {
        Commands::Inspect(args) => inspect::execute(args, &config),
        Commands::List(args) => list::execute(args, &config),
        Commands::Preview(args) => preview::execute(args, &config),
        Commands::Simulate(args) => simulate::execute(args, &config),
    }
}

/// Decode a replay file with the configured decoder options
pub(crate) fn load_replay(path: &Path, config: &Config) -> Result<ReplayWrapper> {
    bsreplay_core::decode_file(path, &config.decode_options())
        .with_context(|| format!("Failed to decode replay {}", path.display()))
}
