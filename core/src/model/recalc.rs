//! Note key recalculation
//!
//! Some recorder versions wrote note keys that cannot be decoded on their own
//! (negative keys, or keys carrying the +30000 scoring-type bug). Those are
//! resolved against the beatmap that is actually being played.

use super::events::{EventData, NoteInfo};

/// A note as the host beatmap describes it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatmapNote {
    pub scoring_type: i32,
    pub line_index: i32,
    pub line_layer: i32,
    pub color_type: i32,
    pub cut_direction: i32,
    /// Beat time of the note
    pub time: f32,
}

impl BeatmapNote {
    pub fn info(&self) -> NoteInfo {
        NoteInfo {
            scoring_type: self.scoring_type,
            line_index: self.line_index,
            line_layer: self.line_layer,
            color_type: self.color_type,
            cut_direction: self.cut_direction,
        }
    }
}

/// Replace recorded note keys with canonical beatmap keys
///
/// Beatmap notes are walked in order. Each one claims the first still
/// unmatched recorded note whose key equals the canonical key, or equals it
/// plus the legacy offset. Recorded notes nothing claims are left as they
/// are. Returns the number of notes rewritten.
pub fn recalculate_notes(data: &mut EventData, beatmap: &[BeatmapNote]) -> usize {
    let mut pool: Vec<usize> = (0..data.notes.len()).collect();
    let mut rewritten = 0;

    for note in beatmap {
        let canonical = note.info();
        let key = canonical.key();
        let found = pool
            .iter()
            .position(|&i| NoteInfo::key_matches(data.notes[i].id, key));
        if let Some(slot) = found {
            let index = pool.remove(slot);
            data.notes[index].info = canonical;
            rewritten += 1;
        }
    }

    if !pool.is_empty() {
        log::warn!(
            "{} recorded notes did not match any beatmap note during recalculation",
            pool.len()
        );
    }

    data.needs_recalculation = false;
    rewritten
}
