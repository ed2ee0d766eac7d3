//! bsreplay core - replay decoding and deterministic playback
//!
//! This crate reads the replay formats recorded by VR rhythm-game mods and
//! plays them back against song time.
//!
//! # Architecture
//!
//! - [`binary`] - Little-endian reader/writer primitives
//! - [`lzma`] - Serialised LZMA codec for ScoreSaber payloads
//! - [`formats`] - Legacy, BSOR and ScoreSaber decoders
//! - [`model`] - Unified replay model, note recalculation and energy rules
//! - [`PlaybackSession`] - Pose interpolation, event dispatch and scoring
//! - [`ReplaySelector`] - Replay lookup per beatmap

pub mod binary;
pub mod config;
pub mod error;
pub mod formats;
#[cfg(test)]
mod integration;
pub mod lzma;
pub mod model;
pub mod playback;
pub mod selector;
#[cfg(test)]
pub mod test_utils;

// Re-export the common entry points
pub use config::{Config, PlaybackConfig, ReplayDirs};
pub use error::{ReplayError, Result};
pub use formats::{DecodeOptions, Format, decode, decode_file};
pub use model::{
    BeatmapNote, EventData, FrameData, Modifiers, Replay, ReplayInfo, ReplayKind, ReplayWrapper,
};
pub use playback::{
    LiveNotes, NullHost, PlaybackSession, PlaybackState, PoseSample, ReplayHost, ScoreSnapshot,
};
pub use selector::{BeatmapKey, FoundReplay, ReplayScan, ReplaySelector, ScanStatus};
