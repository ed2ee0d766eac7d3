//! Inspect command - header metadata and timeline sizes

use anyhow::Result;
use bsreplay_core::{Config, ReplayKind, ReplayWrapper};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// Replay file (.reqlay, .bsor or .dat)
    pub file: PathBuf,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

/// Everything `inspect` reports about one replay
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub path: Option<PathBuf>,
    pub source: String,
    pub kind: Vec<&'static str>,
    pub timestamp: i64,
    pub score: i32,
    pub modifiers: Vec<&'static str>,
    pub player_name: Option<String>,
    pub characteristic: Option<String>,
    pub failed: bool,
    pub fail_time: f32,
    pub reached_zero_energy: Option<f32>,
    pub jump_distance: Option<f32>,
    pub player_height: Option<f32>,
    pub duration: f32,
    pub poses: usize,
    pub keyframes: Option<usize>,
    pub notes: Option<usize>,
    pub walls: Option<usize>,
    pub heights: Option<usize>,
    pub pauses: Option<usize>,
    pub needs_recalculation: bool,
    pub extra: BTreeMap<String, String>,
}

impl InspectReport {
    pub fn new(wrapper: &ReplayWrapper) -> Self {
        let replay = &wrapper.replay;
        let info = replay.info();
        let events = replay.events();

        let mut kind = Vec::new();
        if wrapper.kind.contains(ReplayKind::FRAME) {
            kind.push("frame");
        }
        if wrapper.kind.contains(ReplayKind::EVENT) {
            kind.push("event");
        }

        Self {
            path: wrapper.path.clone(),
            source: info.source.clone(),
            kind,
            timestamp: info.timestamp,
            score: info.score,
            modifiers: info.modifiers.names(),
            player_name: info.player_name.clone(),
            characteristic: info.characteristic.clone(),
            failed: info.failed,
            fail_time: info.fail_time,
            reached_zero_energy: info.reached_zero_energy,
            jump_distance: info.jump_distance,
            player_height: info.player_height,
            duration: replay.duration(),
            poses: replay.poses().len(),
            keyframes: replay.frames().map(|f| f.frames.len()),
            notes: events.map(|e| e.notes.len()),
            walls: events.map(|e| e.walls.len()),
            heights: events.map(|e| e.heights.len()),
            pauses: events.map(|e| e.pauses.len()),
            needs_recalculation: wrapper.needs_recalculation(),
            extra: info.extra.clone(),
        }
    }

    fn print(&self) {
        if let Some(path) = &self.path {
            println!("=== {} ===", path.display());
        }
        println!("  Source:     {} ({})", self.source, self.kind.join("+"));
        if let Some(player) = &self.player_name {
            println!("  Player:     {}", player);
        }
        println!("  Score:      {}", self.score);
        if !self.modifiers.is_empty() {
            println!("  Modifiers:  {}", self.modifiers.join(", "));
        }
        if let Some(characteristic) = &self.characteristic {
            println!("  Mode:       {}", characteristic);
        }
        if self.failed {
            println!("  Failed at:  {:.2}s", self.fail_time);
        }
        println!("  Duration:   {:.2}s ({} poses)", self.duration, self.poses);
        if let Some(keyframes) = self.keyframes {
            println!("  Keyframes:  {}", keyframes);
        }
        if let Some(notes) = self.notes {
            println!(
                "  Events:     {} notes, {} walls, {} heights, {} pauses",
                notes,
                self.walls.unwrap_or(0),
                self.heights.unwrap_or(0),
                self.pauses.unwrap_or(0)
            );
        }
        if self.needs_recalculation {
            println!("  Note keys need recalculation against the beatmap");
        }
        for (key, value) in &self.extra {
            println!("  {:<11} {}", format!("{}:", key), value);
        }
    }
}

/// Execute the inspect command
pub fn execute(args: InspectArgs, config: &Config) -> Result<()> {
    let wrapper = crate::load_replay(&args.file, config)?;
    let report = InspectReport::new(&wrapper);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}
