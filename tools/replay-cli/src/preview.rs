//! Preview command - score and pose at one song time

use anyhow::{Result, bail};
use bsreplay_core::{Config, PlaybackSession};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the preview command
#[derive(Args)]
pub struct PreviewArgs {
    /// Replay file (.reqlay, .bsor or .dat)
    pub file: PathBuf,

    /// Song time in seconds
    #[arg(long)]
    pub time: f32,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct PreviewReport {
    pub time: f32,
    pub score: i32,
    pub max_score: i32,
    pub combo: i32,
    pub energy: f32,
    /// Head position as `[x, y, z]`
    pub head: Option<[f32; 3]>,
}

/// Seek a session to `time` and describe the state there
pub fn preview(session: &mut PlaybackSession, time: f32) -> PreviewReport {
    session.seek_to(time);
    let snapshot = session.preview_at(time);
    PreviewReport {
        time,
        score: snapshot.score,
        max_score: snapshot.max_score,
        combo: snapshot.combo,
        energy: snapshot.energy,
        head: session.pose().map(|pose| pose.head.position.to_array()),
    }
}

/// Execute the preview command
pub fn execute(args: PreviewArgs, config: &Config) -> Result<()> {
    if !args.time.is_finite() || args.time < 0.0 {
        bail!("--time must be a non-negative number of seconds");
    }
    let wrapper = crate::load_replay(&args.file, config)?;
    let mut session = PlaybackSession::from_wrapper(&wrapper, &config.playback);
    let report = preview(&mut session, args.time);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== {:.3}s ===", report.time);
    println!("  Score:   {} / {}", report.score, report.max_score);
    println!("  Combo:   {}", report.combo);
    println!("  Energy:  {:.2}", report.energy);
    if let Some([x, y, z]) = report.head {
        println!("  Head:    ({:.3}, {:.3}, {:.3})", x, y, z);
    }
    Ok(())
}
