//! Simulate command - play a replay headlessly to the end
//!
//! Drives a [`PlaybackSession`] at a fixed time step, the way a game loop
//! would, and reports what the host would have seen.

use anyhow::{Result, bail};
use bsreplay_core::model::{NoteCutInfo, NoteEvent, PauseEvent, WallEvent};
use bsreplay_core::playback::NoteHandle;
use bsreplay_core::{Config, PlaybackSession, PlaybackState, ReplayHost};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the simulate command
#[derive(Args)]
pub struct SimulateArgs {
    /// Replay file (.reqlay, .bsor or .dat)
    pub file: PathBuf,

    /// Seconds of song time per update (default: one 90 Hz frame)
    #[arg(long, default_value_t = 1.0 / 90.0)]
    pub step: f32,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Host callbacks tallied over a run
#[derive(Debug, Default, Serialize)]
pub struct HostTally {
    pub cuts: usize,
    pub bad_cuts: usize,
    pub misses: usize,
    pub bombs: usize,
    pub walls: usize,
    pub height_changes: usize,
    pub pauses: usize,
}

impl ReplayHost for HostTally {
    fn cut_note(&mut self, _live: Option<NoteHandle>, _note: &NoteEvent, cut: &NoteCutInfo) {
        if cut.all_ok() {
            self.cuts += 1;
        } else {
            self.bad_cuts += 1;
        }
    }

    fn miss_note(&mut self, _live: Option<NoteHandle>, _note: &NoteEvent) {
        self.misses += 1;
    }

    fn hit_bomb(&mut self, _live: Option<NoteHandle>, _note: &NoteEvent) {
        self.bombs += 1;
    }

    fn enter_obstacle(&mut self, _wall: &WallEvent) {
        self.walls += 1;
    }

    fn set_player_height(&mut self, _height: f32) {
        self.height_changes += 1;
    }

    fn pause(&mut self, _pause: &PauseEvent) {
        self.pauses += 1;
    }
}

#[derive(Debug, Serialize)]
pub struct SimulateReport {
    pub updates: usize,
    pub end_time: f32,
    pub score: i32,
    pub max_score: i32,
    pub combo: i32,
    pub energy: f32,
    pub failed_at: Option<f32>,
    pub host: HostTally,
}

/// Run `session` from the start until every timeline is consumed
pub fn simulate(session: &mut PlaybackSession, step: f32) -> SimulateReport {
    let mut host = HostTally::default();
    let end = session.replay().duration();
    session.start(0.0);

    let mut updates = 0;
    let mut time = 0.0_f32;
    loop {
        session.update_time(time, &mut host);
        updates += 1;
        if session.state() == PlaybackState::Ended || time >= end {
            break;
        }
        time = (time + step).min(end);
    }

    let snapshot = session.snapshot();
    SimulateReport {
        updates,
        end_time: session.time(),
        score: snapshot.score,
        max_score: snapshot.max_score,
        combo: snapshot.combo,
        energy: snapshot.energy,
        failed_at: session.failed_at(),
        host,
    }
}

/// Execute the simulate command
pub fn execute(args: SimulateArgs, config: &Config) -> Result<()> {
    if !(args.step > 0.0 && args.step.is_finite()) {
        bail!("--step must be a positive number of seconds");
    }
    let wrapper = crate::load_replay(&args.file, config)?;
    let mut session = PlaybackSession::from_wrapper(&wrapper, &config.playback);
    let report = simulate(&mut session, args.step);
    tracing::info!("simulated {} updates", report.updates);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== Simulation ===");
    println!("  Updates:  {} (ended at {:.2}s)", report.updates, report.end_time);
    println!("  Score:    {} / {}", report.score, report.max_score);
    println!("  Combo:    {}", report.combo);
    println!("  Energy:   {:.2}", report.energy);
    if let Some(t) = report.failed_at {
        println!("  Failed:   {:.2}s", t);
    }
    let host = &report.host;
    println!(
        "  Notes:    {} good, {} bad, {} missed, {} bombs",
        host.cuts, host.bad_cuts, host.misses, host.bombs
    );
    println!("  Walls:    {}", host.walls);
    println!("  Pauses:   {}", host.pauses);
    Ok(())
}
