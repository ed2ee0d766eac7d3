//! Replay playback session
//!
//! A session walks three timelines in lockstep as the host advances song
//! time: poses (interpolated every update), discrete events (fired through
//! [`ReplayHost`]) and score keyframes (coalesced into a last-known value).
//!
//! ```text
//! Idle ──start──▶ Started ──update_time──▶ Playing ──end of timelines──▶ Ended
//!                              ▲   │
//!                    seek_to   │   ▼ seek_to
//!                            Seeking
//! ```

use super::host::{LiveNotes, NullHost, ReplayHost};
use super::interpolate::{PoseSample, advance_cursor, sample};
use super::scoring::{ScoreSnapshot, ScoreTracker};
use crate::config::PlaybackConfig;
use crate::model::{
    EventData, EventKind, EventRef, NoteCutInfo, NoteEventType, Replay, ReplayWrapper, ScoreFrame,
};
use std::sync::Arc;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Created, not started
    Idle,
    /// Cursors positioned, nothing played yet
    Started,
    /// Rebuilding state for a new position
    Seeking,
    Playing,
    /// Every timeline has been consumed
    Ended,
}

/// Deterministic playback of one replay
pub struct PlaybackSession {
    replay: Arc<Replay>,
    lookahead_window: usize,
    state: PlaybackState,
    time: f32,
    /// Event timeline flattened for cursor access
    timeline: Vec<EventRef>,
    pose_cursor: usize,
    event_cursor: usize,
    frame_cursor: usize,
    /// Walls the head is inside, by wall index
    inside: Vec<usize>,
    /// Walls to re-enter on the first update after a seek
    reenter: Vec<usize>,
    tracker: ScoreTracker,
    keyframe: Option<ScoreFrame>,
    pose: Option<PoseSample>,
    live_notes: LiveNotes,
}

impl PlaybackSession {
    pub fn new(replay: Arc<Replay>, config: &PlaybackConfig) -> Self {
        let timeline = replay
            .events()
            .map(|events| events.events.iter().copied().collect())
            .unwrap_or_default();
        let tracker = ScoreTracker::new(replay.info().modifiers);
        Self {
            replay,
            lookahead_window: config.lookahead_window,
            state: PlaybackState::Idle,
            time: f32::NEG_INFINITY,
            timeline,
            pose_cursor: 0,
            event_cursor: 0,
            frame_cursor: 0,
            inside: Vec::new(),
            reenter: Vec::new(),
            tracker,
            keyframe: None,
            pose: None,
            live_notes: LiveNotes::new(),
        }
    }

    pub fn from_wrapper(wrapper: &ReplayWrapper, config: &PlaybackConfig) -> Self {
        Self::new(Arc::clone(&wrapper.replay), config)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Song time of the last update
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Interpolated pose of the last update
    pub fn pose(&self) -> Option<PoseSample> {
        self.pose
    }

    /// Last-known score keyframe, merged field by field
    pub fn keyframe(&self) -> Option<ScoreFrame> {
        self.keyframe
    }

    /// Song time the simulated energy ran out, if it did
    pub fn failed_at(&self) -> Option<f32> {
        self.tracker.failed_at()
    }

    /// Notes the host has spawned, used to match recorded note events
    pub fn live_notes_mut(&mut self) -> &mut LiveNotes {
        &mut self.live_notes
    }

    fn reset(&mut self) {
        self.pose_cursor = 0;
        self.event_cursor = 0;
        self.frame_cursor = 0;
        self.inside.clear();
        self.reenter.clear();
        self.tracker = ScoreTracker::new(self.replay.info().modifiers);
        self.keyframe = None;
        self.pose = None;
        self.time = f32::NEG_INFINITY;
    }

    /// Position every cursor at `start_time` without replaying earlier events
    pub fn start(&mut self, start_time: f32) {
        self.reset();
        self.event_cursor = self.timeline.partition_point(|e| e.time < start_time);
        if let Some(frames) = self.replay.frames() {
            self.frame_cursor = frames.frames.partition_point(|f| f.time < start_time);
        }
        self.time = start_time;
        self.state = PlaybackState::Started;
    }

    /// Advance playback to song time `time`
    ///
    /// Time only moves forward; an earlier time is ignored. Use
    /// [`seek_to`](Self::seek_to) to jump backwards.
    pub fn update_time(&mut self, time: f32, host: &mut dyn ReplayHost) -> Option<PoseSample> {
        match self.state {
            PlaybackState::Idle => self.start(0.0),
            PlaybackState::Ended => return self.pose,
            _ => {}
        }
        if time < self.time {
            log::debug!("ignoring backwards update from {} to {}", self.time, time);
            return self.pose;
        }

        self.state = PlaybackState::Playing;
        if !self.reenter.is_empty() {
            let replay = Arc::clone(&self.replay);
            if let Some(events) = replay.events() {
                for index in std::mem::take(&mut self.reenter) {
                    host.enter_obstacle(&events.walls[index]);
                }
            }
        }

        self.advance(time, host);
        self.pose
    }

    /// Jump to `time`, forwards or backwards
    ///
    /// State is rebuilt by replaying everything before `time` without host
    /// callbacks. Walls the head is inside at `time` are re-entered on the
    /// next [`update_time`](Self::update_time).
    pub fn seek_to(&mut self, time: f32) {
        self.reset();
        self.state = PlaybackState::Seeking;
        self.advance(time, &mut NullHost);
        self.reenter = self.inside.clone();
        if self.state == PlaybackState::Seeking {
            self.state = PlaybackState::Playing;
        }
    }

    /// Score state at `time`, computed without touching the session
    pub fn preview_at(&self, time: f32) -> ScoreSnapshot {
        let mut tracker = ScoreTracker::new(self.replay.info().modifiers);
        if let Some(events) = self.replay.events() {
            for event in self.timeline.iter().take_while(|e| e.time < time) {
                match event.kind {
                    EventKind::Note => tracker.note(&events.notes[event.index]),
                    EventKind::Wall => tracker.enter_wall(&events.walls[event.index]),
                    EventKind::Height | EventKind::Pause => {}
                }
            }
        }

        let keyframe = self.replay.frames().and_then(|frames| {
            frames
                .frames
                .iter()
                .take_while(|f| f.time <= time)
                .fold(None, |acc: Option<ScoreFrame>, frame| {
                    let mut merged = acc.unwrap_or(*frame);
                    merged.merge_from(frame);
                    Some(merged)
                })
        });

        self.compose(tracker.snapshot_at(time), keyframe)
    }

    /// Score state at the current time
    pub fn snapshot(&self) -> ScoreSnapshot {
        self.compose(self.tracker.snapshot_at(self.time), self.keyframe)
    }

    /// Recorded keyframes override simulated values where present
    fn compose(&self, simulated: ScoreSnapshot, keyframe: Option<ScoreFrame>) -> ScoreSnapshot {
        let mut snapshot = simulated;
        let Some(frame) = keyframe else {
            return snapshot;
        };
        if let Some(score) = frame.score {
            snapshot.score = score;
        }
        if let Some(combo) = frame.combo {
            snapshot.combo = combo;
        }
        if let Some(energy) = frame.energy {
            snapshot.energy = energy;
        }
        if self.replay.events().is_none() {
            snapshot.max_score = match frame.percent {
                Some(percent) if percent > 0.0 => (snapshot.score as f32 / percent).round() as i32,
                _ => 0,
            };
        }
        snapshot
    }

    /// Whether the host may let the combo drop near the current time
    pub fn allow_combo_drop(&self) -> bool {
        match self.replay.frames().filter(|f| !f.frames.is_empty()) {
            Some(frames) => {
                let combos: Vec<i32> = self
                    .window(&frames.frames, self.frame_cursor)
                    .iter()
                    .filter_map(|f| f.combo)
                    .collect();
                combos.windows(2).any(|pair| pair[1] < pair[0])
            }
            None => self.break_near_event_cursor(),
        }
    }

    /// Whether the host may take the recorded score over its own near the
    /// current time
    pub fn allow_score_override(&self) -> bool {
        match self.replay.frames().filter(|f| !f.frames.is_empty()) {
            Some(frames) => {
                let scores: Vec<i32> = self
                    .window(&frames.frames, self.frame_cursor)
                    .iter()
                    .filter_map(|f| f.score)
                    .collect();
                scores.windows(2).any(|pair| pair[1] > pair[0])
            }
            None => self.break_near_event_cursor(),
        }
    }

    /// `±lookahead_window` entries around the last consumed entry
    fn window<'a, T>(&self, items: &'a [T], cursor: usize) -> &'a [T] {
        let current = cursor.saturating_sub(1);
        let start = current.saturating_sub(self.lookahead_window);
        let end = (current + self.lookahead_window + 1).min(items.len());
        &items[start.min(end)..end]
    }

    fn break_near_event_cursor(&self) -> bool {
        let Some(events) = self.replay.events() else {
            return false;
        };
        self.window(&self.timeline, self.event_cursor)
            .iter()
            .any(|event| match event.kind {
                EventKind::Note => events.notes[event.index].event_type != NoteEventType::Good,
                EventKind::Wall => true,
                EventKind::Height | EventKind::Pause => false,
            })
    }

    // ========================================================================
    // Timeline walking
    // ========================================================================

    fn advance(&mut self, time: f32, host: &mut dyn ReplayHost) {
        let replay = Arc::clone(&self.replay);

        let poses = replay.poses();
        advance_cursor(poses, &mut self.pose_cursor, time);
        self.pose = sample(poses, self.pose_cursor, time);

        if let Some(events) = replay.events() {
            while let Some(event) = self.timeline.get(self.event_cursor).copied() {
                if event.time >= time {
                    break;
                }
                self.fire_exits(events, event.time, host);
                self.fire(events, event, host);
                self.event_cursor += 1;
            }
            self.fire_exits(events, time, host);
        }

        if let Some(frames) = replay.frames() {
            while let Some(frame) = frames.frames.get(self.frame_cursor) {
                if frame.time > time {
                    break;
                }
                let previous_offset = self.keyframe.and_then(|k| k.offset);
                match &mut self.keyframe {
                    Some(keyframe) => keyframe.merge_from(frame),
                    None => self.keyframe = Some(*frame),
                }
                if frame.offset.is_some() && frame.offset != previous_offset {
                    host.set_player_height(frame.offset.unwrap_or_default());
                }
                self.frame_cursor += 1;
            }
        }

        self.time = time;
        if self.is_exhausted(&replay, time) {
            self.state = PlaybackState::Ended;
        }
    }

    fn fire(&mut self, events: &EventData, event: EventRef, host: &mut dyn ReplayHost) {
        match event.kind {
            EventKind::Note => {
                let note = &events.notes[event.index];
                self.tracker.note(note);
                let live = if self.state == PlaybackState::Seeking {
                    None
                } else {
                    let live = self.live_notes.take_match(note);
                    if live.is_none() && !self.live_notes.is_empty() {
                        log::warn!(
                            "no spawned note matches recorded note {} at {:.3}s",
                            note.id,
                            note.time
                        );
                    }
                    live
                };
                match note.event_type {
                    NoteEventType::Good | NoteEventType::Bad => {
                        let good = note.event_type == NoteEventType::Good;
                        let cut = note
                            .cut_info
                            .unwrap_or_else(|| NoteCutInfo::synthetic(good, note.info.color_type));
                        host.cut_note(live, note, &cut);
                    }
                    NoteEventType::Miss => host.miss_note(live, note),
                    NoteEventType::Bomb => host.hit_bomb(live, note),
                }
            }
            EventKind::Wall => {
                let wall = &events.walls[event.index];
                self.tracker.enter_wall(wall);
                self.inside.push(event.index);
                host.enter_obstacle(wall);
            }
            EventKind::Height => host.set_player_height(events.heights[event.index].height),
            EventKind::Pause => host.pause(&events.pauses[event.index]),
        }
    }

    /// Exit every wall that ended strictly before `before`, in end order
    fn fire_exits(&mut self, events: &EventData, before: f32, host: &mut dyn ReplayHost) {
        loop {
            let next = self
                .inside
                .iter()
                .enumerate()
                .filter(|&(_, &wall)| events.walls[wall].end_time < before)
                .min_by(|&(_, &a), &(_, &b)| {
                    events.walls[a].end_time.total_cmp(&events.walls[b].end_time)
                })
                .map(|(slot, &wall)| (slot, wall));
            let Some((slot, wall)) = next else {
                break;
            };
            self.inside.swap_remove(slot);
            host.exit_obstacle(&events.walls[wall]);
        }
    }

    fn is_exhausted(&self, replay: &Replay, time: f32) -> bool {
        let frames_done = replay
            .frames()
            .is_none_or(|f| self.frame_cursor >= f.frames.len());
        self.event_cursor >= self.timeline.len()
            && self.inside.is_empty()
            && frames_done
            && time >= replay.duration()
    }
}
