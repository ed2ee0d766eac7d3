//! List command - find the replays recorded for a beatmap
//!
//! Directories come from the config file; `--dir kind=path` overrides one
//! producer's directory and `--external` replaces the scan entirely.

use anyhow::{Result, bail};
use bsreplay_core::{BeatmapKey, Config, ReplayDirs, ReplaySelector};
use clap::Args;
use std::path::PathBuf;

/// Replay producer a directory belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    Legacy,
    Bsor,
    ScoreSaber,
}

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// Level id, e.g. custom_level_ABCDEF
    #[arg(long)]
    pub level_id: String,

    /// Difficulty name, e.g. ExpertPlus
    #[arg(long)]
    pub difficulty: String,

    /// Beatmap characteristic, e.g. Standard
    #[arg(long, default_value = "Standard")]
    pub characteristic: String,

    /// Replay directory override as kind=path (kind: legacy, bsor, scoresaber)
    #[arg(long = "dir", value_parser = parse_dir)]
    pub dirs: Vec<(DirKind, PathBuf)>,

    /// Use this single replay instead of scanning directories
    #[arg(long)]
    pub external: Option<PathBuf>,
}

/// Parse a `kind=path` directory override
pub fn parse_dir(value: &str) -> Result<(DirKind, PathBuf)> {
    let Some((kind, path)) = value.split_once('=') else {
        bail!("expected kind=path, got '{}'", value);
    };
    let kind = match kind.to_ascii_lowercase().as_str() {
        "legacy" | "reqlay" => DirKind::Legacy,
        "bsor" | "beatleader" => DirKind::Bsor,
        "scoresaber" | "ss" => DirKind::ScoreSaber,
        other => bail!("unknown replay directory kind '{}'", other),
    };
    if path.is_empty() {
        bail!("empty path for {:?} directory", kind);
    }
    Ok((kind, PathBuf::from(path)))
}

/// Configured directories with command line overrides applied
fn resolve_dirs(args: &ListArgs, config: &Config) -> ReplayDirs {
    let mut dirs = config.replays.clone();
    for (kind, path) in &args.dirs {
        let slot = match kind {
            DirKind::Legacy => &mut dirs.legacy_dir,
            DirKind::Bsor => &mut dirs.bsor_dir,
            DirKind::ScoreSaber => &mut dirs.scoresaber_dir,
        };
        *slot = Some(path.clone());
    }
    if args.external.is_some() {
        dirs.external = args.external.clone();
    }
    dirs
}

/// Execute the list command
pub fn execute(args: ListArgs, config: &Config) -> Result<()> {
    let selector = ReplaySelector::new(resolve_dirs(&args, config), config.decode_options());
    let key = BeatmapKey::new(&args.level_id, &args.difficulty, &args.characteristic);
    let found = selector.replays_for_beatmap(&key);

    if found.is_empty() {
        println!("No replays for {} {} {}", key.level_id, key.difficulty, key.characteristic);
        return Ok(());
    }

    for replay in &found {
        let info = replay.replay.info();
        println!(
            "{:>9}  {:<12}  {:<20}  {}",
            info.score,
            info.source,
            info.player_name.as_deref().unwrap_or("-"),
            replay.path.display()
        );
    }
    Ok(())
}
