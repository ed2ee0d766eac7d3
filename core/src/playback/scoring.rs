//! Score, combo, multiplier and energy simulation
//!
//! [`ScoreTracker`] replays note and wall events into a running score. It is
//! pure: the same events in the same order always give the same snapshot,
//! which is what makes [`seek_to`](super::PlaybackSession::seek_to) and
//! [`preview_at`](super::PlaybackSession::preview_at) agree with playing
//! through.

use crate::model::{
    EnergyCounter, Modifiers, NoteCutInfo, NoteEvent, NoteEventType, NoteKind, ScoringType,
    WallEvent, covered_seconds, energy_delta,
};

/// Highest combo multiplier
pub const MAX_MULTIPLIER: i32 = 8;

/// Cut distance at which the accuracy component reaches zero
const ACCURACY_DISTANCE: f32 = 0.3;

const BEFORE_CUT_MAX: i32 = 70;
const AFTER_CUT_MAX: i32 = 30;
const ACCURACY_MAX: i32 = 15;
const CHAIN_LINK_SCORE: i32 = 20;

// ============================================================================
// Cut score
// ============================================================================

/// Score components of one cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CutScore {
    pub before: i32,
    pub after: i32,
    /// Centre-distance component; chain links report their fixed score here
    pub accuracy: i32,
}

impl CutScore {
    pub fn total(&self) -> i32 {
        self.before + self.after + self.accuracy
    }
}

/// Score of a good cut before the multiplier
pub fn cut_score(scoring: ScoringType, cut: &NoteCutInfo) -> CutScore {
    let before = (BEFORE_CUT_MAX as f32 * cut.before_cut_rating.clamp(0.0, 1.0)).round() as i32;
    let after = (AFTER_CUT_MAX as f32 * cut.after_cut_rating.clamp(0.0, 1.0)).round() as i32;
    let distance = (cut.cut_distance_to_center / ACCURACY_DISTANCE).clamp(0.0, 1.0);
    let accuracy = (ACCURACY_MAX as f32 * (1.0 - distance)).round() as i32;

    match scoring {
        ScoringType::Ignore | ScoringType::NoScore => CutScore::default(),
        ScoringType::Normal => CutScore {
            before,
            after,
            accuracy,
        },
        ScoringType::ArcHead => CutScore {
            before,
            after: AFTER_CUT_MAX,
            accuracy,
        },
        ScoringType::ArcTail => CutScore {
            before: BEFORE_CUT_MAX,
            after,
            accuracy,
        },
        ScoringType::ChainHead => CutScore {
            before,
            after: 0,
            accuracy,
        },
        ScoringType::ChainLink => CutScore {
            before: 0,
            after: 0,
            accuracy: CHAIN_LINK_SCORE,
        },
    }
}

/// Best possible score of a cut before the multiplier
pub fn max_cut_score(scoring: ScoringType) -> i32 {
    match scoring {
        ScoringType::Ignore | ScoringType::NoScore => 0,
        ScoringType::Normal | ScoringType::ArcHead | ScoringType::ArcTail => {
            BEFORE_CUT_MAX + AFTER_CUT_MAX + ACCURACY_MAX
        }
        ScoringType::ChainHead => BEFORE_CUT_MAX + ACCURACY_MAX,
        ScoringType::ChainLink => CHAIN_LINK_SCORE,
    }
}

// ============================================================================
// Multiplier
// ============================================================================

/// Combo multiplier state machine
///
/// Doubles after `value * 2` consecutive hits (up to 8). Any break halves
/// it (down to 1) and restarts progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplier {
    value: i32,
    progress: i32,
}

impl Default for Multiplier {
    fn default() -> Self {
        Self {
            value: 1,
            progress: 0,
        }
    }
}

impl Multiplier {
    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn hit(&mut self) {
        if self.value >= MAX_MULTIPLIER {
            return;
        }
        self.progress += 1;
        if self.progress >= self.value * 2 {
            self.value *= 2;
            self.progress = 0;
        }
    }

    pub fn break_combo(&mut self) {
        self.value = (self.value / 2).max(1);
        self.progress = 0;
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Score state at one song time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSnapshot {
    pub score: i32,
    /// Score of a perfect play of the same notes
    pub max_score: i32,
    pub combo: i32,
    pub energy: f32,
}

/// Running score simulation over an event timeline
#[derive(Debug, Clone)]
pub struct ScoreTracker {
    score: i32,
    max_score: i32,
    combo: i32,
    multiplier: Multiplier,
    max_multiplier: Multiplier,
    energy: EnergyCounter,
    /// Walls entered so far as `(start, end)`, sorted by start
    walls: Vec<(f32, f32)>,
    /// Time the energy counter is settled up to
    clock: f32,
}

impl ScoreTracker {
    pub fn new(modifiers: Modifiers) -> Self {
        Self {
            score: 0,
            max_score: 0,
            combo: 0,
            multiplier: Multiplier::default(),
            max_multiplier: Multiplier::default(),
            energy: EnergyCounter::new(modifiers),
            walls: Vec::new(),
            clock: f32::NEG_INFINITY,
        }
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier.value()
    }

    /// Song time the player failed, if they did
    pub fn failed_at(&self) -> Option<f32> {
        self.energy.failed_at()
    }

    /// Settle wall drain up to an event boundary
    fn settle(&mut self, time: f32) {
        if time <= self.clock {
            return;
        }
        let drained = covered_seconds(self.walls.iter().copied(), self.clock, time);
        self.energy.drain(drained, time);
        self.clock = time;
        self.walls.retain(|&(_, end)| end > time);
    }

    pub fn note(&mut self, note: &NoteEvent) {
        self.settle(note.time);

        let kind = NoteKind::of(&note.info, note.event_type);
        self.energy.apply(energy_delta(kind, note.event_type), note.time);

        if note.event_type == NoteEventType::Bomb || kind == NoteKind::Bomb {
            if note.event_type != NoteEventType::Miss {
                self.break_combo();
            }
            return;
        }

        let scoring = note.info.scoring().unwrap_or(ScoringType::Normal);
        let max = max_cut_score(scoring);
        self.max_score += max * self.max_multiplier.value();
        self.max_multiplier.hit();

        match (note.event_type, note.cut_info) {
            (NoteEventType::Good, Some(cut)) => {
                self.score += cut_score(scoring, &cut).total() * self.multiplier.value();
                self.multiplier.hit();
                self.combo += 1;
            }
            (NoteEventType::Good, None) => {
                self.multiplier.hit();
                self.combo += 1;
            }
            _ => self.break_combo(),
        }
    }

    pub fn enter_wall(&mut self, wall: &WallEvent) {
        self.settle(wall.time);
        self.energy.enter_wall(wall.time);
        self.walls.push((wall.time, wall.end_time));
        self.break_combo();
    }

    fn break_combo(&mut self) {
        self.combo = 0;
        self.multiplier.break_combo();
    }

    /// State at `time`, at or after the last event
    ///
    /// Wall drain since the last event is computed, not applied, so the
    /// result does not depend on how often this is called.
    pub fn snapshot_at(&self, time: f32) -> ScoreSnapshot {
        let mut energy = self.energy;
        if time > self.clock {
            let drained = covered_seconds(self.walls.iter().copied(), self.clock, time);
            energy.drain(drained, time);
        }
        ScoreSnapshot {
            score: self.score,
            max_score: self.max_score,
            combo: self.combo,
            energy: energy.energy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteInfo;
    use crate::test_utils::good_cut;

    fn note(event_type: NoteEventType, time: f32) -> NoteEvent {
        let info = NoteInfo {
            scoring_type: 1,
            line_index: 1,
            line_layer: 0,
            color_type: 0,
            cut_direction: 1,
        };
        NoteEvent {
            id: info.key(),
            info,
            event_type,
            cut_info: event_type.has_cut().then(|| good_cut(0)),
            time,
            spawn_time: time,
        }
    }

    #[test]
    fn test_multiplier_progression() {
        let mut multiplier = Multiplier::default();
        let mut applied = Vec::new();
        for _ in 0..20 {
            applied.push(multiplier.value());
            multiplier.hit();
        }
        let mut expected = vec![1, 1, 2, 2, 2, 2];
        expected.extend([4; 8]);
        expected.extend([8; 6]);
        assert_eq!(applied, expected);
    }

    #[test]
    fn test_multiplier_halves_on_break() {
        let mut multiplier = Multiplier::default();
        for _ in 0..14 {
            multiplier.hit();
        }
        assert_eq!(multiplier.value(), 8);
        multiplier.break_combo();
        assert_eq!(multiplier.value(), 4);
        multiplier.hit();
        multiplier.break_combo();
        assert_eq!(multiplier.value(), 2);
        multiplier.break_combo();
        multiplier.break_combo();
        assert_eq!(multiplier.value(), 1);
    }

    #[test]
    fn test_cut_score_per_scoring_type() {
        let mut cut = good_cut(0);
        cut.before_cut_rating = 0.5;
        cut.after_cut_rating = 0.5;
        cut.cut_distance_to_center = 0.15;

        assert_eq!(cut_score(ScoringType::Normal, &cut).total(), 35 + 15 + 8);
        assert_eq!(cut_score(ScoringType::ArcHead, &cut).after, 30);
        assert_eq!(cut_score(ScoringType::ArcTail, &cut).before, 70);
        assert_eq!(cut_score(ScoringType::ChainHead, &cut).after, 0);
        assert_eq!(cut_score(ScoringType::ChainLink, &cut).total(), 20);
        assert_eq!(cut_score(ScoringType::NoScore, &cut).total(), 0);

        assert_eq!(max_cut_score(ScoringType::Normal), 115);
        assert_eq!(max_cut_score(ScoringType::ChainHead), 85);
        assert_eq!(max_cut_score(ScoringType::ChainLink), 20);
    }

    #[test]
    fn test_perfect_play_matches_max_score() {
        let mut tracker = ScoreTracker::new(Modifiers::empty());
        for i in 0..20 {
            tracker.note(&note(NoteEventType::Good, i as f32));
        }
        let snapshot = tracker.snapshot_at(20.0);
        assert_eq!(snapshot.score, snapshot.max_score);
        assert_eq!(snapshot.combo, 20);
        assert_eq!(tracker.multiplier(), 8);
    }

    #[test]
    fn test_miss_breaks_combo_but_not_max() {
        let mut tracker = ScoreTracker::new(Modifiers::empty());
        tracker.note(&note(NoteEventType::Good, 1.0));
        tracker.note(&note(NoteEventType::Miss, 2.0));
        let snapshot = tracker.snapshot_at(2.0);
        assert_eq!(snapshot.combo, 0);
        assert_eq!(snapshot.score, 115);
        assert_eq!(snapshot.max_score, 115 + 115);
        assert!((snapshot.energy - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_drain_is_independent_of_sampling() {
        let wall = WallEvent {
            line_index: 0,
            obstacle_type: 0,
            width: 1,
            energy: 0.0,
            time: 1.0,
            end_time: 1.2,
            spawn_time: 0.0,
        };
        let mut tracker = ScoreTracker::new(Modifiers::empty());
        tracker.enter_wall(&wall);

        let a = tracker.snapshot_at(1.1).energy;
        let b = tracker.snapshot_at(5.0).energy;
        assert!((a - (0.5 - 0.13)).abs() < 1e-5);
        assert!((b - (0.5 - 0.26)).abs() < 1e-5);
        assert_eq!(tracker.snapshot_at(5.0).energy, b);
    }
}
