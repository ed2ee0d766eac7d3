//! Host game interface
//!
//! Playback never touches the game directly. Every side effect goes through
//! [`ReplayHost`], and the host tells playback which notes currently exist
//! through [`LiveNotes`].

use crate::model::{NoteCutInfo, NoteEvent, NoteInfo, PauseEvent, WallEvent};

/// Host-side identifier of a spawned note
pub type NoteHandle = u64;

/// Callbacks fired while playing a replay
///
/// All methods default to doing nothing.
pub trait ReplayHost {
    /// A recorded good or bad cut; `live` is the matching spawned note
    fn cut_note(&mut self, live: Option<NoteHandle>, note: &NoteEvent, cut: &NoteCutInfo) {
        let _ = (live, note, cut);
    }

    fn miss_note(&mut self, live: Option<NoteHandle>, note: &NoteEvent) {
        let _ = (live, note);
    }

    fn hit_bomb(&mut self, live: Option<NoteHandle>, note: &NoteEvent) {
        let _ = (live, note);
    }

    fn enter_obstacle(&mut self, wall: &WallEvent) {
        let _ = wall;
    }

    fn exit_obstacle(&mut self, wall: &WallEvent) {
        let _ = wall;
    }

    fn set_player_height(&mut self, height: f32) {
        let _ = height;
    }

    fn pause(&mut self, pause: &PauseEvent) {
        let _ = pause;
    }
}

/// Host that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl ReplayHost for NullHost {}

#[derive(Debug, Clone, Copy)]
struct LiveNote {
    handle: NoteHandle,
    key: i32,
    time: f32,
}

/// Notes the host has spawned and not yet despawned
#[derive(Debug, Clone, Default)]
pub struct LiveNotes {
    notes: Vec<LiveNote>,
}

impl LiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a spawned note with its beat time
    pub fn add(&mut self, handle: NoteHandle, info: NoteInfo, time: f32) {
        self.notes.push(LiveNote {
            handle,
            key: info.key(),
            time,
        });
    }

    pub fn remove(&mut self, handle: NoteHandle) {
        self.notes.retain(|n| n.handle != handle);
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    /// Find and remove the live note a recorded event refers to
    ///
    /// Among notes whose key matches (directly or after the legacy offset
    /// correction), the one closest in time to the event's spawn time wins.
    pub fn take_match(&mut self, event: &NoteEvent) -> Option<NoteHandle> {
        let recorded = event.id;
        let (index, _) = self
            .notes
            .iter()
            .enumerate()
            .filter(|(_, n)| NoteInfo::key_matches(recorded, n.key))
            .min_by(|(_, a), (_, b)| {
                let da = (a.time - event.spawn_time).abs();
                let db = (b.time - event.spawn_time).abs();
                da.total_cmp(&db)
            })?;
        Some(self.notes.swap_remove(index).handle)
    }
}
