//! Event timeline types
//!
//! Event replays record discrete gameplay events instead of continuous
//! score samples. The timeline is a set of [`EventRef`]s pointing into the
//! per-kind backing arrays.

use super::types::{Pose, ReplayInfo, Transform};
use glam::Vec3;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Offset introduced by a historical recorder bug that double-counted the
/// scoring-type digit of the note key
pub const LEGACY_KEY_OFFSET: i32 = 30000;

// ============================================================================
// Timeline
// ============================================================================

/// Kind of a timeline entry
///
/// The declaration order is the tie-break order for equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Note,
    Wall,
    Height,
    Pause,
}

/// Reference into one of the event backing arrays
///
/// Ordered by `(time, kind, index)`. Notes, walls and heights sharing a
/// timestamp must replay in the same sequence every time.
#[derive(Debug, Clone, Copy)]
pub struct EventRef {
    pub time: f32,
    pub kind: EventKind,
    pub index: usize,
}

impl PartialEq for EventRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventRef {}

impl PartialOrd for EventRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.index.cmp(&other.index))
    }
}

// ============================================================================
// Notes
// ============================================================================

/// How a note is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringType {
    Ignore,
    NoScore,
    Normal,
    ArcHead,
    ArcTail,
    ChainHead,
    ChainLink,
}

impl ScoringType {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -1 => Some(ScoringType::Ignore),
            0 => Some(ScoringType::NoScore),
            1 => Some(ScoringType::Normal),
            2 => Some(ScoringType::ArcHead),
            3 => Some(ScoringType::ArcTail),
            4 => Some(ScoringType::ChainHead),
            5 => Some(ScoringType::ChainLink),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            ScoringType::Ignore => -1,
            ScoringType::NoScore => 0,
            ScoringType::Normal => 1,
            ScoringType::ArcHead => 2,
            ScoringType::ArcTail => 3,
            ScoringType::ChainHead => 4,
            ScoringType::ChainLink => 5,
        }
    }
}

/// Composite identity of a note
///
/// Fields are kept raw: mapping-extension maps use line indices and layers
/// outside the standard grid, and those still have to produce the key the
/// recorder produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NoteInfo {
    pub scoring_type: i32,
    pub line_index: i32,
    pub line_layer: i32,
    /// 0 left, 1 right, -1 bomb
    pub color_type: i32,
    pub cut_direction: i32,
}

impl NoteInfo {
    /// Positional note key
    ///
    /// `(scoringType+2)*10000 + lineIndex*1000 + lineLayer*100 + color*10 +
    /// cutDirection`, with a color of -1 stored as 3.
    pub fn key(&self) -> i32 {
        let color = if self.color_type == -1 { 3 } else { self.color_type };
        (self.scoring_type.wrapping_add(2))
            .wrapping_mul(10000)
            .wrapping_add(self.line_index.wrapping_mul(1000))
            .wrapping_add(self.line_layer.wrapping_mul(100))
            .wrapping_add(color.wrapping_mul(10))
            .wrapping_add(self.cut_direction)
    }

    /// Unpack a positional note key
    pub fn from_key(key: i32) -> Self {
        let color = (key / 10) % 10;
        NoteInfo {
            scoring_type: key / 10000 - 2,
            line_index: (key / 1000) % 10,
            line_layer: (key / 100) % 10,
            color_type: if color == 3 { -1 } else { color },
            cut_direction: key % 10,
        }
    }

    /// Whether a recorded key refers to the note with the given canonical key
    pub fn key_matches(recorded: i32, canonical: i32) -> bool {
        recorded == canonical || recorded == canonical.wrapping_add(LEGACY_KEY_OFFSET)
    }

    pub fn scoring(&self) -> Option<ScoringType> {
        ScoringType::from_i32(self.scoring_type)
    }

    /// A key that cannot be trusted without beatmap data
    pub fn is_ambiguous(&self) -> bool {
        self.scoring().is_none()
    }
}

/// Outcome recorded for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteEventType {
    Good,
    Bad,
    Miss,
    Bomb,
}

impl NoteEventType {
    /// Whether the event carries cut measurements
    pub fn has_cut(self) -> bool {
        matches!(self, NoteEventType::Good | NoteEventType::Bad)
    }
}

/// Physical cut measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCutInfo {
    pub speed_ok: bool,
    pub direction_ok: bool,
    pub saber_type_ok: bool,
    pub was_cut_too_soon: bool,
    /// Negative means "recompute from motion"
    pub saber_speed: f32,
    pub saber_direction: Vec3,
    pub saber_type: i32,
    pub time_deviation: f32,
    pub cut_direction_deviation: f32,
    pub cut_point: Vec3,
    pub cut_normal: Vec3,
    pub cut_distance_to_center: f32,
    pub cut_angle: f32,
    pub before_cut_rating: f32,
    pub after_cut_rating: f32,
}

impl NoteCutInfo {
    /// Saber speed value meaning "not recorded"
    pub const UNKNOWN_SPEED: f32 = -1.0;

    /// Stand-in for implausible recorded cut data
    ///
    /// Always counts as a weak good or bad cut.
    pub fn synthetic(good: bool, saber_type: i32) -> Self {
        NoteCutInfo {
            speed_ok: true,
            direction_ok: good,
            saber_type_ok: true,
            was_cut_too_soon: false,
            saber_speed: Self::UNKNOWN_SPEED,
            saber_direction: Vec3::ZERO,
            saber_type: saber_type.clamp(0, 1),
            time_deviation: 0.0,
            cut_direction_deviation: 0.0,
            cut_point: Vec3::ZERO,
            cut_normal: Vec3::Y,
            cut_distance_to_center: 0.0,
            cut_angle: 0.0,
            before_cut_rating: 0.0,
            after_cut_rating: 0.0,
        }
    }

    /// A cut the game would have counted as good
    pub fn all_ok(&self) -> bool {
        self.speed_ok && self.direction_ok && self.saber_type_ok && !self.was_cut_too_soon
    }
}

/// A recorded note outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Note id exactly as the recorder wrote it
    ///
    /// Mapping-extension and bugged ids do not survive a trip through
    /// [`NoteInfo`], so matching and re-encoding use this value.
    pub id: i32,
    pub info: NoteInfo,
    pub event_type: NoteEventType,
    /// Present only for good and bad cuts
    pub cut_info: Option<NoteCutInfo>,
    /// Song time of the event
    pub time: f32,
    /// Beat time of the note itself
    pub spawn_time: f32,
}

// ============================================================================
// Walls, heights, pauses
// ============================================================================

/// Head entering an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallEvent {
    pub line_index: i32,
    pub obstacle_type: i32,
    pub width: i32,
    /// Energy value stored by the recorder
    pub energy: f32,
    /// Entry time
    pub time: f32,
    /// Exit time (recorded or reconstructed)
    pub end_time: f32,
    pub spawn_time: f32,
}

impl WallEvent {
    /// Unpack `lineIndex*100 + obstacleType*10 + width`
    pub fn id_parts(id: i32) -> (i32, i32, i32) {
        (id / 100, (id / 10) % 10, id % 10)
    }

    pub fn id(&self) -> i32 {
        self.line_index * 100 + self.obstacle_type * 10 + self.width
    }

    pub fn duration(&self) -> f32 {
        (self.end_time - self.time).max(0.0)
    }
}

/// Player height (jump offset) change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightEvent {
    pub height: f32,
    pub time: f32,
}

/// Game pause
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseEvent {
    /// Seconds spent paused
    pub duration: i64,
    pub time: f32,
}

/// Room offsets applied to the controllers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerOffsets {
    pub left: Transform,
    pub right: Transform,
}

// ============================================================================
// Event replay payload
// ============================================================================

/// Payload of an event replay
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventData {
    pub info: ReplayInfo,
    pub poses: Vec<Pose>,
    pub notes: Vec<NoteEvent>,
    pub walls: Vec<WallEvent>,
    pub heights: Vec<HeightEvent>,
    pub pauses: Vec<PauseEvent>,
    /// Timeline over the backing arrays
    pub events: BTreeSet<EventRef>,
    /// Note keys are ambiguous and must be resolved against beatmap data
    pub needs_recalculation: bool,
    pub controller_offsets: Option<ControllerOffsets>,
    pub custom_data: BTreeMap<String, Vec<u8>>,
}

impl EventData {
    /// Rebuild the timeline from the backing arrays
    pub fn rebuild_events(&mut self) {
        let notes = self.notes.iter().enumerate().map(|(index, n)| EventRef {
            time: n.time,
            kind: EventKind::Note,
            index,
        });
        let walls = self.walls.iter().enumerate().map(|(index, w)| EventRef {
            time: w.time,
            kind: EventKind::Wall,
            index,
        });
        let heights = self.heights.iter().enumerate().map(|(index, h)| EventRef {
            time: h.time,
            kind: EventKind::Height,
            index,
        });
        let pauses = self.pauses.iter().enumerate().map(|(index, p)| EventRef {
            time: p.time,
            kind: EventKind::Pause,
            index,
        });
        self.events = notes.chain(walls).chain(heights).chain(pauses).collect();
    }

    /// Number of scorable notes (excluding bombs)
    pub fn note_count(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| n.event_type != NoteEventType::Bomb)
            .count()
    }
}
