//! Core replay types shared by every format
//!
//! A replay is a pose timeline plus header metadata. Frame replays add a
//! score-keyframe timeline, event replays add discrete gameplay events (see
//! [`events`](super::events)).

use glam::{Quat, Vec3};
use std::collections::BTreeMap;

/// Position and orientation of a tracked device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Interpolate towards `other`: linear position, shortest-path slerp
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }
}

/// One head and hands sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// Song time in seconds
    pub time: f32,
    /// Frame rate reported by the recorder (0 when not recorded)
    pub fps: i32,
    pub head: Transform,
    pub left_hand: Transform,
    pub right_hand: Transform,
}

bitflags::bitflags! {
    /// Gameplay modifiers active during the play
    ///
    /// Each format has its own encoding; see the per-format code tables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u16 {
        const NO_FAIL = 1 << 0;
        const ONE_LIFE = 1 << 1;
        const FOUR_LIVES = 1 << 2;
        const FASTER_SONG = 1 << 3;
        const SLOWER_SONG = 1 << 4;
        const NO_ARROWS = 1 << 5;
        const NO_BOMBS = 1 << 6;
        const NO_OBSTACLES = 1 << 7;
        const GHOST_NOTES = 1 << 8;
        const DISAPPEARING_ARROWS = 1 << 9;
        const STRICT_ANGLES = 1 << 10;
        const PRO_MODE = 1 << 11;
        const SMALL_NOTES = 1 << 12;
        const SUPER_FAST_SONG = 1 << 13;
        const LEFT_HANDED = 1 << 14;
    }
}

impl Modifiers {
    /// Build a set from a packed run of flags in a format-specific order
    pub fn from_ordered(order: &[Modifiers], values: &[bool]) -> Self {
        order
            .iter()
            .zip(values)
            .filter(|(_, set)| **set)
            .fold(Modifiers::empty(), |acc, (flag, _)| acc | *flag)
    }

    /// Build a set from a two-letter code table
    ///
    /// Codes are searched as substrings, so the text may use any delimiter
    /// or none at all.
    pub fn from_codes(table: &[(&str, Modifiers)], text: &str) -> Self {
        table
            .iter()
            .filter(|(code, _)| text.contains(code))
            .fold(Modifiers::empty(), |acc, (_, flag)| acc | *flag)
    }

    /// Short names of the set flags, for display
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Practice-mode parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Practice {
    /// Song time the practice run started at
    pub start_time: f32,
    /// Song speed multiplier
    pub speed: f32,
}

/// Header metadata of a replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayInfo {
    /// Unix timestamp of the play (0 when unknown)
    pub timestamp: i64,
    pub score: i32,
    pub modifiers: Modifiers,
    /// Human readable label of the producer
    pub source: String,
    /// Positions are room-relative instead of world space
    pub positions_are_local: bool,
    /// A jump height (y offset) stream is present
    pub has_y_offset: bool,
    pub player_name: Option<String>,
    /// The producer verified the player identity
    pub player_ok: bool,
    /// Bias correction applied to recorded head rotations
    pub average_offset: Quat,
    pub practice: Option<Practice>,
    pub failed: bool,
    /// Song time of the fail (0 when not failed)
    pub fail_time: f32,
    /// Song time energy first reached zero under no-fail
    pub reached_zero_energy: Option<f32>,
    pub jump_distance: Option<f32>,
    /// Beatmap characteristic ("Standard", "360Degree", ...)
    pub characteristic: Option<String>,
    /// Player height recorded at the start of the play
    pub player_height: Option<f32>,
    /// Producer-specific header text (level hash, platform, ...)
    pub extra: BTreeMap<String, String>,
}

impl Default for ReplayInfo {
    fn default() -> Self {
        Self {
            timestamp: 0,
            score: 0,
            modifiers: Modifiers::empty(),
            source: String::new(),
            positions_are_local: false,
            has_y_offset: false,
            player_name: None,
            player_ok: false,
            average_offset: Quat::IDENTITY,
            practice: None,
            failed: false,
            fail_time: 0.0,
            reached_zero_energy: None,
            jump_distance: None,
            characteristic: None,
            player_height: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ReplayInfo {
    /// Remove the systematic forward-facing bias from a head rotation
    pub fn level_rotation(&self, rotation: Quat) -> Quat {
        (self.average_offset * rotation).normalize()
    }

    /// Producer-specific header value
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Whether the beatmap rotates the play space (360/90 degree maps)
    pub fn is_rotating_map(&self) -> bool {
        self.characteristic
            .as_deref()
            .is_some_and(|c| c.contains("360") || c.contains("90"))
    }
}

/// One score keyframe
///
/// Fields are `None` when the source did not record them at this time;
/// merging only overwrites fields that are present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreFrame {
    pub time: f32,
    pub score: Option<i32>,
    pub percent: Option<f32>,
    pub combo: Option<i32>,
    pub energy: Option<f32>,
    /// Jump height offset
    pub offset: Option<f32>,
}

impl ScoreFrame {
    /// Overwrite the fields of `self` that `newer` specifies
    pub fn merge_from(&mut self, newer: &ScoreFrame) {
        self.time = newer.time;
        if newer.score.is_some() {
            self.score = newer.score;
        }
        if newer.percent.is_some() {
            self.percent = newer.percent;
        }
        if newer.combo.is_some() {
            self.combo = newer.combo;
        }
        if newer.energy.is_some() {
            self.energy = newer.energy;
        }
        if newer.offset.is_some() {
            self.offset = newer.offset;
        }
    }
}

/// Payload of a keyframe replay
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameData {
    pub info: ReplayInfo,
    pub poses: Vec<Pose>,
    /// Ordered by time
    pub frames: Vec<ScoreFrame>,
}
