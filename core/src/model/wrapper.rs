//! Decoded replay container

use super::events::EventData;
use super::recalc::{BeatmapNote, recalculate_notes};
use super::types::{FrameData, Pose, ReplayInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;

bitflags::bitflags! {
    /// Which timelines a replay carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReplayKind: u8 {
        /// Score keyframes
        const FRAME = 1 << 0;
        /// Discrete gameplay events
        const EVENT = 1 << 1;
    }
}

/// Replay payload
#[derive(Debug, Clone, PartialEq)]
pub enum Replay {
    Frame(FrameData),
    Event(EventData),
    /// Keyframes and events recorded side by side; poses come from the
    /// frame half
    Both(FrameData, EventData),
}

impl Replay {
    pub fn kind(&self) -> ReplayKind {
        match self {
            Replay::Frame(_) => ReplayKind::FRAME,
            Replay::Event(_) => ReplayKind::EVENT,
            Replay::Both(..) => ReplayKind::FRAME | ReplayKind::EVENT,
        }
    }

    pub fn info(&self) -> &ReplayInfo {
        match self {
            Replay::Frame(frames) | Replay::Both(frames, _) => &frames.info,
            Replay::Event(events) => &events.info,
        }
    }

    pub fn poses(&self) -> &[Pose] {
        match self {
            Replay::Frame(frames) | Replay::Both(frames, _) => &frames.poses,
            Replay::Event(events) => &events.poses,
        }
    }

    pub fn frames(&self) -> Option<&FrameData> {
        match self {
            Replay::Frame(frames) | Replay::Both(frames, _) => Some(frames),
            Replay::Event(_) => None,
        }
    }

    pub fn events(&self) -> Option<&EventData> {
        match self {
            Replay::Event(events) | Replay::Both(_, events) => Some(events),
            Replay::Frame(_) => None,
        }
    }

    fn events_mut(&mut self) -> Option<&mut EventData> {
        match self {
            Replay::Event(events) | Replay::Both(_, events) => Some(events),
            Replay::Frame(_) => None,
        }
    }

    /// Song time of the last pose
    pub fn duration(&self) -> f32 {
        self.poses().last().map_or(0.0, |p| p.time)
    }
}

/// A decoded replay plus where it came from
///
/// The payload is shared; sessions and the selector clone the `Arc`, never
/// the data.
#[derive(Debug, Clone)]
pub struct ReplayWrapper {
    pub kind: ReplayKind,
    pub replay: Arc<Replay>,
    pub path: Option<PathBuf>,
}

impl ReplayWrapper {
    pub fn new(replay: Replay) -> Self {
        Self {
            kind: replay.kind(),
            replay: Arc::new(replay),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn info(&self) -> &ReplayInfo {
        self.replay.info()
    }

    pub fn needs_recalculation(&self) -> bool {
        self.replay.events().is_some_and(|e| e.needs_recalculation)
    }

    /// Resolve ambiguous note keys against the played beatmap
    ///
    /// Does nothing when the replay has no events or its keys are already
    /// trusted. Copies the payload first if other holders share it.
    pub fn recalculate(&mut self, beatmap: &[BeatmapNote]) -> usize {
        if !self.needs_recalculation() {
            return 0;
        }
        match Arc::make_mut(&mut self.replay).events_mut() {
            Some(events) => {
                let rewritten = recalculate_notes(events, beatmap);
                events.rebuild_events();
                rewritten
            }
            None => 0,
        }
    }
}
