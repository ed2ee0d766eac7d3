//! Unified replay model
//!
//! Every decoder produces these types; playback consumes only these types.

pub mod energy;
pub mod events;
pub mod recalc;
pub mod rotation;
pub mod types;
pub mod wrapper;

pub use energy::{
    EnergyCounter, EnergyMode, NoteKind, WALL_DRAIN_PER_SECOND, covered_seconds, energy_delta,
};
pub use events::{
    ControllerOffsets, EventData, EventKind, EventRef, HeightEvent, LEGACY_KEY_OFFSET, NoteCutInfo,
    NoteEvent, NoteEventType, NoteInfo, PauseEvent, ScoringType, WallEvent,
};
pub use recalc::{BeatmapNote, recalculate_notes};
pub use rotation::{RotationAverager, average_rotation_offset};
pub use types::{FrameData, Modifiers, Pose, Practice, ReplayInfo, ScoreFrame, Transform};
pub use wrapper::{Replay, ReplayKind, ReplayWrapper};
