//! Deterministic replay playback
//!
//! [`PlaybackSession`] drives a decoded replay against song time and reports
//! gameplay through a [`ReplayHost`].

mod host;
mod interpolate;
mod scoring;
mod session;

pub use host::{LiveNotes, NoteHandle, NullHost, ReplayHost};
pub use interpolate::{PoseSample, advance_cursor, sample};
pub use scoring::{
    CutScore, MAX_MULTIPLIER, Multiplier, ScoreSnapshot, ScoreTracker, cut_score, max_cut_score,
};
pub use session::{PlaybackSession, PlaybackState};
