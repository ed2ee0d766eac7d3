//! Energy model
//!
//! Single source of energy deltas for both wall end-time reconstruction and
//! playback simulation.

use super::events::{NoteEventType, NoteInfo, ScoringType};
use super::types::Modifiers;

/// Energy drained per second while the head is inside a wall
pub const WALL_DRAIN_PER_SECOND: f32 = 1.3;

/// Energy cost of one life with the four-lives modifier
pub const BATTERY_LIFE: f32 = 0.25;

/// Energy category of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Normal,
    /// Chain links after the chain head
    ChainLink,
    Bomb,
}

impl NoteKind {
    pub fn of(info: &NoteInfo, event_type: NoteEventType) -> Self {
        if event_type == NoteEventType::Bomb || info.color_type == -1 {
            NoteKind::Bomb
        } else if info.scoring() == Some(ScoringType::ChainLink) {
            NoteKind::ChainLink
        } else {
            NoteKind::Normal
        }
    }
}

/// Energy change caused by a note outcome
pub fn energy_delta(kind: NoteKind, event_type: NoteEventType) -> f32 {
    match (kind, event_type) {
        (NoteKind::Bomb, NoteEventType::Miss) => 0.0,
        (NoteKind::Bomb, _) | (_, NoteEventType::Bomb) => -0.15,
        (NoteKind::ChainLink, NoteEventType::Good) => 0.002,
        (NoteKind::ChainLink, NoteEventType::Bad) => -0.025,
        (NoteKind::ChainLink, NoteEventType::Miss) => -0.03,
        (NoteKind::Normal, NoteEventType::Good) => 0.01,
        (NoteKind::Normal, NoteEventType::Bad) => -0.1,
        (NoteKind::Normal, NoteEventType::Miss) => -0.15,
    }
}

/// Seconds of `[from, to]` covered by the union of wall intervals
///
/// Intervals are `(start, end)` pairs sorted by start. Overlapping walls
/// drain once, not once per wall.
pub fn covered_seconds(intervals: impl IntoIterator<Item = (f32, f32)>, from: f32, to: f32) -> f32 {
    if to <= from {
        return 0.0;
    }
    let mut total = 0.0;
    let mut current: Option<(f32, f32)> = None;
    for (start, end) in intervals {
        match current {
            Some((s, e)) if start <= e => current = Some((s, e.max(end))),
            Some(span) => {
                total += overlap(span, from, to);
                current = Some((start, end));
            }
            None => current = Some((start, end)),
        }
    }
    if let Some(span) = current {
        total += overlap(span, from, to);
    }
    total
}

fn overlap((start, end): (f32, f32), from: f32, to: f32) -> f32 {
    (end.min(to) - start.max(from)).max(0.0)
}

/// How negative deltas are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyMode {
    /// Clamp to `[0, 1]`
    Normal,
    /// Any negative delta empties the bar
    OneLife,
    /// Each negative delta costs one quarter
    FourLives,
}

impl EnergyMode {
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.contains(Modifiers::ONE_LIFE) {
            EnergyMode::OneLife
        } else if modifiers.contains(Modifiers::FOUR_LIVES) {
            EnergyMode::FourLives
        } else {
            EnergyMode::Normal
        }
    }

    pub fn starting_energy(self) -> f32 {
        match self {
            EnergyMode::Normal => 0.5,
            EnergyMode::OneLife | EnergyMode::FourLives => 1.0,
        }
    }
}

/// Energy bar with modifier semantics and fail tracking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCounter {
    energy: f32,
    mode: EnergyMode,
    no_fail: bool,
    failed_at: Option<f32>,
    reached_zero_at: Option<f32>,
}

impl EnergyCounter {
    pub fn new(modifiers: Modifiers) -> Self {
        let mode = EnergyMode::from_modifiers(modifiers);
        Self {
            energy: mode.starting_energy(),
            mode,
            no_fail: modifiers.contains(Modifiers::NO_FAIL),
            failed_at: None,
            reached_zero_at: None,
        }
    }

    pub fn energy(&self) -> f32 {
        self.energy
    }

    pub fn mode(&self) -> EnergyMode {
        self.mode
    }

    /// Song time the player failed, if they did
    pub fn failed_at(&self) -> Option<f32> {
        self.failed_at
    }

    /// Song time energy first reached zero (also under no-fail)
    pub fn reached_zero_at(&self) -> Option<f32> {
        self.reached_zero_at
    }

    /// Apply a note delta at `time`
    pub fn apply(&mut self, delta: f32, time: f32) {
        if self.failed_at.is_some() || delta == 0.0 {
            return;
        }
        self.energy = match self.mode {
            EnergyMode::OneLife if delta < 0.0 => 0.0,
            EnergyMode::FourLives if delta < 0.0 => (self.energy - BATTERY_LIFE).max(0.0),
            EnergyMode::OneLife | EnergyMode::FourLives => self.energy,
            EnergyMode::Normal => (self.energy + delta).clamp(0.0, 1.0),
        };
        self.check_zero(time);
    }

    /// Head entered a wall at `time`
    pub fn enter_wall(&mut self, time: f32) {
        if self.mode != EnergyMode::Normal {
            self.apply(-1.0, time);
        }
    }

    /// Continuous wall drain of `seconds` of overlap, ending at `time`
    pub fn drain(&mut self, seconds: f32, time: f32) {
        if self.failed_at.is_some() || self.mode != EnergyMode::Normal || seconds <= 0.0 {
            return;
        }
        self.energy = (self.energy - seconds * WALL_DRAIN_PER_SECOND).max(0.0);
        self.check_zero(time);
    }

    fn check_zero(&mut self, time: f32) {
        if self.energy > 0.0 {
            return;
        }
        self.energy = 0.0;
        if self.reached_zero_at.is_none() {
            self.reached_zero_at = Some(time);
        }
        if !self.no_fail {
            self.failed_at = Some(time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_note() -> NoteInfo {
        NoteInfo {
            scoring_type: 1,
            line_index: 1,
            line_layer: 0,
            color_type: 0,
            cut_direction: 1,
        }
    }

    #[test]
    fn test_energy_delta_table() {
        assert_eq!(energy_delta(NoteKind::Normal, NoteEventType::Good), 0.01);
        assert_eq!(energy_delta(NoteKind::Normal, NoteEventType::Bad), -0.1);
        assert_eq!(energy_delta(NoteKind::Normal, NoteEventType::Miss), -0.15);
        assert_eq!(energy_delta(NoteKind::ChainLink, NoteEventType::Good), 0.002);
        assert_eq!(energy_delta(NoteKind::ChainLink, NoteEventType::Miss), -0.03);
        assert_eq!(energy_delta(NoteKind::Bomb, NoteEventType::Bomb), -0.15);
        assert_eq!(energy_delta(NoteKind::Bomb, NoteEventType::Miss), 0.0);
    }

    #[test]
    fn test_covered_seconds_counts_overlap_once() {
        let walls = [(1.0, 3.0), (2.0, 4.0), (6.0, 7.0)];
        assert_eq!(covered_seconds(walls, 0.0, 10.0), 4.0);
        assert_eq!(covered_seconds(walls, 2.5, 6.5), 2.0);
        assert_eq!(covered_seconds(walls, 5.0, 5.0), 0.0);
    }

    #[test]
    fn test_note_kind() {
        let mut info = normal_note();
        assert_eq!(NoteKind::of(&info, NoteEventType::Good), NoteKind::Normal);
        info.scoring_type = 5;
        assert_eq!(NoteKind::of(&info, NoteEventType::Good), NoteKind::ChainLink);
        assert_eq!(NoteKind::of(&info, NoteEventType::Bomb), NoteKind::Bomb);
    }

    #[test]
    fn test_normal_mode_clamps() {
        let mut counter = EnergyCounter::new(Modifiers::empty());
        assert_eq!(counter.energy(), 0.5);
        for i in 0..100 {
            counter.apply(0.01, i as f32);
        }
        assert_eq!(counter.energy(), 1.0);
        assert!(counter.failed_at().is_none());
    }

    #[test]
    fn test_one_life_zeroes_on_any_loss() {
        let mut counter = EnergyCounter::new(Modifiers::ONE_LIFE);
        assert_eq!(counter.energy(), 1.0);
        counter.apply(-0.03, 2.0);
        assert_eq!(counter.energy(), 0.0);
        assert_eq!(counter.failed_at(), Some(2.0));
    }

    #[test]
    fn test_four_lives_costs_quarters() {
        let mut counter = EnergyCounter::new(Modifiers::FOUR_LIVES);
        counter.apply(-0.1, 1.0);
        assert_eq!(counter.energy(), 0.75);
        counter.apply(0.01, 1.5);
        assert_eq!(counter.energy(), 0.75);
        counter.enter_wall(2.0);
        assert_eq!(counter.energy(), 0.5);
        counter.drain(10.0, 3.0);
        assert_eq!(counter.energy(), 0.5);
    }

    #[test]
    fn test_no_fail_keeps_going() {
        let mut counter = EnergyCounter::new(Modifiers::NO_FAIL);
        counter.drain(1.0, 4.0);
        assert_eq!(counter.energy(), 0.0);
        assert_eq!(counter.reached_zero_at(), Some(4.0));
        assert!(counter.failed_at().is_none());
        counter.apply(0.01, 5.0);
        assert_eq!(counter.energy(), 0.01);
    }

    #[test]
    fn test_failed_counter_is_frozen() {
        let mut counter = EnergyCounter::new(Modifiers::empty());
        counter.drain(1.0, 4.0);
        assert_eq!(counter.failed_at(), Some(4.0));
        counter.apply(0.01, 5.0);
        assert_eq!(counter.energy(), 0.0);
    }
}
