//! Shared test utilities for unit and integration tests
//!
//! Byte-level fixture builders for the three replay formats. Each builder
//! writes a small but complete file with the same writer the encoders use.

use crate::binary::ReplayWriter;
use crate::formats::{bsor, legacy, scoresaber};
use crate::lzma;
use crate::model::{ControllerOffsets, NoteCutInfo, NoteEventType, ScoreFrame, Transform};
use glam::{Quat, Vec3};

type Writer = ReplayWriter<Vec<u8>>;

fn writer() -> Writer {
    ReplayWriter::new(Vec::new())
}

/// A clean good cut with the given saber
pub fn good_cut(saber_type: i32) -> NoteCutInfo {
    NoteCutInfo {
        speed_ok: true,
        direction_ok: true,
        saber_type_ok: true,
        was_cut_too_soon: false,
        saber_speed: 20.0,
        saber_direction: Vec3::NEG_Y,
        saber_type,
        time_deviation: 0.0,
        cut_direction_deviation: 0.0,
        cut_point: Vec3::ZERO,
        cut_normal: Vec3::X,
        cut_distance_to_center: 0.0,
        cut_angle: 90.0,
        before_cut_rating: 1.0,
        after_cut_rating: 1.0,
    }
}

// ============================================================================
// Legacy
// ============================================================================

/// Builds `.reqlay` files of any version
///
/// Record `i` carries values derived from `i` (see
/// [`LegacyBuilder::positions`] and [`LegacyBuilder::frame`]) so every field
/// of every record differs.
pub struct LegacyBuilder {
    version: i32,
    records: usize,
    modifier_bits: Vec<usize>,
    fail_time: Option<f32>,
    reached_zero: Option<f32>,
    practice: (f32, f32),
}

impl LegacyBuilder {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            records: 1,
            modifier_bits: Vec::new(),
            fail_time: None,
            reached_zero: None,
            practice: (0.0, 1.0),
        }
    }

    pub fn records(mut self, count: usize) -> Self {
        self.records = count;
        self
    }

    /// Set the modifier at `index` of this version's packed order
    pub fn modifier_bit(mut self, index: usize) -> Self {
        self.modifier_bits.push(index);
        self
    }

    /// Mark the play failed at `time` (version 3 and later)
    pub fn failed(mut self, time: f32) -> Self {
        self.fail_time = Some(time);
        self
    }

    pub fn reached_zero(mut self, time: f32) -> Self {
        self.reached_zero = Some(time);
        self
    }

    pub fn practice(mut self, start_time: f32, speed: f32) -> Self {
        self.practice = (start_time, speed);
        self
    }

    /// Positions of record `i` as (head, left hand, right hand)
    pub fn positions(i: usize) -> [Vec3; 3] {
        let k = i as f32;
        [
            Vec3::new(0.25 * k, 1.75, -0.5),
            Vec3::new(-0.25, 1.0 + 0.125 * k, 0.5),
            Vec3::new(0.25, 1.0, 0.5 + 0.125 * k),
        ]
    }

    /// Euler angles in degrees of record `i`, written by versions 1 to 4
    pub fn euler_degrees(i: usize) -> [Vec3; 3] {
        let k = i as f32;
        [
            Vec3::new(10.0, 30.0 * (k + 1.0), 5.0),
            Vec3::new(0.0, 0.0, 45.0),
            Vec3::new(-20.0, 0.0, 0.0),
        ]
    }

    /// Quaternions of record `i`, written by versions 5 and 6
    pub fn quats(i: usize) -> [Quat; 3] {
        let k = i as f32;
        [
            Quat::from_rotation_y(0.25 * (k + 1.0)),
            Quat::from_rotation_x(0.5),
            Quat::from_rotation_z(-0.5),
        ]
    }

    /// Score keyframe of record `i` as the given version stores it
    pub fn frame(version: i32, i: usize) -> ScoreFrame {
        let k = i as f32;
        ScoreFrame {
            time: 0.5 * k,
            score: Some(100 * i as i32),
            percent: Some(0.9 - 0.05 * k),
            combo: Some(i as i32),
            energy: (version >= 4).then_some(0.5 + 0.125 * k),
            offset: (version >= 6).then_some(0.0625 * k),
        }
    }

    pub fn build(self) -> Vec<u8> {
        let v = self.version;
        let mut w = writer();
        if v > 1 {
            w.write_bytes(&legacy::MAGIC).unwrap();
            w.write_i32(v).unwrap();
        }

        let flag_count = match v {
            1 => 10,
            2..=4 => 14,
            _ => 15,
        };
        for index in 0..flag_count {
            w.write_bool(self.modifier_bits.contains(&index)).unwrap();
        }
        w.write_i64(1_600_000_000).unwrap();
        w.write_i32(1234).unwrap();
        if v >= 3 {
            w.write_bool(self.fail_time.is_some()).unwrap();
            w.write_f32(self.fail_time.unwrap_or(0.0)).unwrap();
        }
        if v >= 5 {
            w.write_bool(self.reached_zero.is_some()).unwrap();
            w.write_f32(self.reached_zero.unwrap_or(0.0)).unwrap();
        }
        if v >= 6 {
            w.write_f32(self.practice.0).unwrap();
            w.write_f32(self.practice.1).unwrap();
        }

        for i in 0..self.records {
            let frame = Self::frame(v, i);
            w.write_f32(frame.time).unwrap();
            let rotations = Self::euler_degrees(i).into_iter().zip(Self::quats(i));
            for (position, (euler, quat)) in Self::positions(i).into_iter().zip(rotations) {
                w.write_vec3(position).unwrap();
                if v >= 5 {
                    w.write_quat(quat).unwrap();
                } else {
                    w.write_vec3(euler).unwrap();
                }
            }
            w.write_i32(frame.score.unwrap()).unwrap();
            w.write_f32(frame.percent.unwrap()).unwrap();
            w.write_i32(frame.combo.unwrap()).unwrap();
            if let Some(energy) = frame.energy {
                w.write_f32(energy).unwrap();
            }
            if let Some(offset) = frame.offset {
                w.write_f32(offset).unwrap();
            }
        }
        w.into_inner()
    }
}

// ============================================================================
// BSOR
// ============================================================================

struct BsorNote {
    id: i32,
    time: f32,
    event_type: NoteEventType,
    cut: Option<NoteCutInfo>,
}

/// Builds `.bsor` files
pub struct BsorBuilder {
    modifiers: String,
    left_handed: bool,
    platform: String,
    mode: String,
    head_rotation: Quat,
    notes: Vec<BsorNote>,
    walls: Vec<(f32, f32)>,
    heights: Vec<(f32, f32)>,
    pauses: Vec<(i64, f32)>,
    controller_offsets: Option<ControllerOffsets>,
    custom_data: Vec<(String, Vec<u8>)>,
    swap_walls_and_heights: bool,
}

impl Default for BsorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BsorBuilder {
    pub fn new() -> Self {
        Self {
            modifiers: String::new(),
            left_handed: false,
            platform: "steam".to_string(),
            mode: "Standard".to_string(),
            head_rotation: Quat::IDENTITY,
            notes: Vec::new(),
            walls: Vec::new(),
            heights: Vec::new(),
            pauses: Vec::new(),
            controller_offsets: None,
            custom_data: Vec::new(),
            swap_walls_and_heights: false,
        }
    }

    pub fn modifiers(mut self, text: &str) -> Self {
        self.modifiers = text.to_string();
        self
    }

    pub fn left_handed(mut self, left_handed: bool) -> Self {
        self.left_handed = left_handed;
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    /// Head rotation of every frame
    pub fn head_rotation(mut self, rotation: Quat) -> Self {
        self.head_rotation = rotation;
        self
    }

    pub fn note(
        mut self,
        id: i32,
        time: f32,
        event_type: NoteEventType,
        cut: Option<NoteCutInfo>,
    ) -> Self {
        self.notes.push(BsorNote {
            id,
            time,
            event_type,
            cut,
        });
        self
    }

    /// Wall at `time` whose energy slot holds `energy`
    pub fn wall(mut self, time: f32, energy: f32) -> Self {
        self.walls.push((time, energy));
        self
    }

    pub fn height(mut self, height: f32, time: f32) -> Self {
        self.heights.push((height, time));
        self
    }

    pub fn pause(mut self, duration: i64, time: f32) -> Self {
        self.pauses.push((duration, time));
        self
    }

    pub fn controller_offsets(mut self, offsets: ControllerOffsets) -> Self {
        self.controller_offsets = Some(offsets);
        self
    }

    pub fn custom_data(mut self, key: &str, value: &[u8]) -> Self {
        self.custom_data.push((key.to_string(), value.to_vec()));
        self
    }

    /// Write the heights section before the walls section
    pub fn swap_walls_and_heights(mut self) -> Self {
        self.swap_walls_and_heights = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut w = writer();
        w.write_i32(bsor::MAGIC).unwrap();
        w.write_u8(bsor::VERSION as u8).unwrap();

        w.write_u8(0).unwrap();
        for text in ["0.9.0", "1.34.2", "1700000000", "76561198000000000", "Player"] {
            w.write_string(text).unwrap();
        }
        w.write_string(&self.platform).unwrap();
        for text in ["Oculus", "Quest 2", "Touch", "ABCDEF", "Song", "Mapper", "ExpertPlus"] {
            w.write_string(text).unwrap();
        }
        w.write_i32(123_456).unwrap();
        w.write_string(&self.mode).unwrap();
        w.write_string("DefaultEnvironment").unwrap();
        w.write_string(&self.modifiers).unwrap();
        w.write_f32(18.0).unwrap();
        w.write_bool(self.left_handed).unwrap();
        w.write_f32(1.75).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_f32(1.0).unwrap();

        w.write_u8(1).unwrap();
        w.write_i32(3).unwrap();
        for i in 0..3 {
            w.write_f32(i as f32 * 0.5).unwrap();
            w.write_i32(90).unwrap();
            w.write_transform(&Transform {
                position: Vec3::new(0.0, 1.7, 0.0),
                rotation: self.head_rotation,
            })
            .unwrap();
            w.write_transform(&Transform::default()).unwrap();
            w.write_transform(&Transform::default()).unwrap();
        }

        w.write_u8(2).unwrap();
        w.write_i32(self.notes.len() as i32).unwrap();
        for note in &self.notes {
            w.write_i32(note.id).unwrap();
            w.write_f32(note.time).unwrap();
            w.write_f32(note.time).unwrap();
            w.write_i32(match note.event_type {
                NoteEventType::Good => 0,
                NoteEventType::Bad => 1,
                NoteEventType::Miss => 2,
                NoteEventType::Bomb => 3,
            })
            .unwrap();
            if let Some(cut) = &note.cut {
                write_cut(&mut w, cut);
            }
        }

        let walls = |w: &mut Writer| {
            w.write_u8(3).unwrap();
            w.write_i32(self.walls.len() as i32).unwrap();
            for &(time, energy) in &self.walls {
                w.write_i32(213).unwrap();
                w.write_f32(energy).unwrap();
                w.write_f32(time).unwrap();
                w.write_f32(time - 1.0).unwrap();
            }
        };
        let heights = |w: &mut Writer| {
            w.write_u8(4).unwrap();
            w.write_i32(self.heights.len() as i32).unwrap();
            for &(height, time) in &self.heights {
                w.write_f32(height).unwrap();
                w.write_f32(time).unwrap();
            }
        };
        if self.swap_walls_and_heights {
            heights(&mut w);
            walls(&mut w);
        } else {
            walls(&mut w);
            heights(&mut w);
        }

        w.write_u8(5).unwrap();
        w.write_i32(self.pauses.len() as i32).unwrap();
        for &(duration, time) in &self.pauses {
            w.write_i64(duration).unwrap();
            w.write_f32(time).unwrap();
        }

        if let Some(offsets) = &self.controller_offsets {
            w.write_u8(6).unwrap();
            w.write_transform(&offsets.left).unwrap();
            w.write_transform(&offsets.right).unwrap();
        }
        if !self.custom_data.is_empty() {
            w.write_u8(7).unwrap();
            w.write_i32(self.custom_data.len() as i32).unwrap();
            for (key, value) in &self.custom_data {
                w.write_string(key).unwrap();
                w.write_i32(value.len() as i32).unwrap();
                w.write_bytes(value).unwrap();
            }
        }
        w.into_inner()
    }
}

fn write_cut(w: &mut Writer, cut: &NoteCutInfo) {
    w.write_bool(cut.speed_ok).unwrap();
    w.write_bool(cut.direction_ok).unwrap();
    w.write_bool(cut.saber_type_ok).unwrap();
    w.write_bool(cut.was_cut_too_soon).unwrap();
    w.write_f32(cut.saber_speed).unwrap();
    w.write_vec3(cut.saber_direction).unwrap();
    w.write_i32(cut.saber_type).unwrap();
    w.write_f32(cut.time_deviation).unwrap();
    w.write_f32(cut.cut_direction_deviation).unwrap();
    w.write_vec3(cut.cut_point).unwrap();
    w.write_vec3(cut.cut_normal).unwrap();
    w.write_f32(cut.cut_distance_to_center).unwrap();
    w.write_f32(cut.cut_angle).unwrap();
    w.write_f32(cut.before_cut_rating).unwrap();
    w.write_f32(cut.after_cut_rating).unwrap();
}

// ============================================================================
// ScoreSaber
// ============================================================================

/// Builds ScoreSaber `.dat` files
pub struct ScoreSaberBuilder {
    version: String,
    modifiers: Vec<String>,
    left_handed: bool,
    notes: Vec<(i32, f32, f32)>,
    scores: Vec<(i32, f32, i32)>,
    combos: Vec<(i32, f32)>,
    energies: Vec<(f32, f32)>,
    heights: Vec<(f32, f32)>,
    fps: Vec<(i32, f32)>,
    corrupt_pointer: Option<(usize, i32)>,
}

impl Default for ScoreSaberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreSaberBuilder {
    pub fn new() -> Self {
        Self {
            version: "3.0.0".to_string(),
            modifiers: Vec::new(),
            left_handed: false,
            notes: Vec::new(),
            scores: Vec::new(),
            combos: Vec::new(),
            energies: Vec::new(),
            heights: Vec::new(),
            fps: Vec::new(),
            corrupt_pointer: None,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn modifiers(mut self, codes: &[&str]) -> Self {
        self.modifiers = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn left_handed(mut self, left_handed: bool) -> Self {
        self.left_handed = left_handed;
        self
    }

    /// Note with a raw event type (0 none, 1 good, 2 bad, 3 miss, 4 bomb)
    pub fn note(mut self, event_type: i32, spawn_time: f32, time: f32) -> Self {
        self.notes.push((event_type, spawn_time, time));
        self
    }

    pub fn score(mut self, score: i32, time: f32, max_score: i32) -> Self {
        self.scores.push((score, time, max_score));
        self
    }

    pub fn combo(mut self, combo: i32, time: f32) -> Self {
        self.combos.push((combo, time));
        self
    }

    pub fn energy(mut self, energy: f32, time: f32) -> Self {
        self.energies.push((energy, time));
        self
    }

    pub fn height(mut self, height: f32, time: f32) -> Self {
        self.heights.push((height, time));
        self
    }

    pub fn fps(mut self, fps: i32, time: f32) -> Self {
        self.fps.push((fps, time));
        self
    }

    /// Overwrite one entry of the pointer table
    pub fn corrupt_pointer(mut self, index: usize, offset: i32) -> Self {
        self.corrupt_pointer = Some((index, offset));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let v3 = self.version.starts_with("3.");
        let mut sections: Vec<Vec<u8>> = Vec::with_capacity(9);

        let mut w = writer();
        w.write_string(&self.version).unwrap();
        w.write_string("custom_level_ABCDEF").unwrap();
        w.write_i32(9).unwrap();
        w.write_string("Standard").unwrap();
        w.write_string("DefaultEnvironment").unwrap();
        w.write_string_list(&self.modifiers).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_bool(self.left_handed).unwrap();
        w.write_f32(1.8).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_vec3(Vec3::ZERO).unwrap();
        w.write_f32(0.0).unwrap();
        sections.push(w.into_inner());

        let mut w = writer();
        w.write_i32(3).unwrap();
        for i in 0..3 {
            w.write_transform(&Transform {
                position: Vec3::new(0.0, 1.7, 0.0),
                rotation: Quat::IDENTITY,
            })
            .unwrap();
            w.write_transform(&Transform::default()).unwrap();
            w.write_transform(&Transform::default()).unwrap();
            w.write_i32(60).unwrap();
            w.write_f32(i as f32 * 0.1).unwrap();
        }
        sections.push(w.into_inner());

        sections.push(pairs(&self.heights, |w, h| w.write_f32(*h).unwrap()));

        let mut w = writer();
        w.write_i32(self.notes.len() as i32).unwrap();
        for &(event_type, spawn_time, time) in &self.notes {
            w.write_f32(spawn_time).unwrap();
            w.write_i32(0).unwrap();
            w.write_i32(1).unwrap();
            w.write_i32(0).unwrap();
            w.write_i32(1).unwrap();
            if v3 {
                w.write_i32(0).unwrap();
                w.write_i32(1).unwrap();
                w.write_f32(0.0).unwrap();
            }
            w.write_i32(event_type).unwrap();
            w.write_vec3(Vec3::ZERO).unwrap();
            w.write_vec3(Vec3::X).unwrap();
            w.write_vec3(Vec3::NEG_Y).unwrap();
            w.write_i32(0).unwrap();
            w.write_bool(true).unwrap();
            for value in [15.0, 90.0, 0.05, 0.0, 1.0, 1.0, time, 1.0, 1.0] {
                w.write_f32(value).unwrap();
            }
        }
        sections.push(w.into_inner());

        let mut w = writer();
        w.write_i32(self.scores.len() as i32).unwrap();
        for &(score, time, max_score) in &self.scores {
            w.write_i32(score).unwrap();
            w.write_f32(time).unwrap();
            if v3 {
                w.write_i32(max_score).unwrap();
            }
        }
        sections.push(w.into_inner());

        sections.push(pairs(&self.combos, |w, c| w.write_i32(*c).unwrap()));

        let mut w = writer();
        w.write_i32(1).unwrap();
        w.write_i32(2).unwrap();
        w.write_f32(0.0).unwrap();
        w.write_f32(0.5).unwrap();
        sections.push(w.into_inner());

        sections.push(pairs(&self.energies, |w, e| w.write_f32(*e).unwrap()));
        sections.push(pairs(&self.fps, |w, f| w.write_i32(*f).unwrap()));

        let mut offsets = Vec::with_capacity(sections.len());
        let mut offset = sections.len() * 4;
        for section in &sections {
            offsets.push(offset as i32);
            offset += section.len();
        }
        if let Some((index, value)) = self.corrupt_pointer {
            offsets[index] = value;
        }

        let mut payload = writer();
        for offset in offsets {
            payload.write_i32(offset).unwrap();
        }
        for section in &sections {
            payload.write_bytes(section).unwrap();
        }

        let mut file = scoresaber::HEADER.to_vec();
        file.extend(lzma::compress(&payload.into_inner()).unwrap());
        file
    }
}

fn pairs<T>(values: &[(T, f32)], write_value: impl Fn(&mut Writer, &T)) -> Vec<u8> {
    let mut w = writer();
    w.write_i32(values.len() as i32).unwrap();
    for (value, time) in values {
        write_value(&mut w, value);
        w.write_f32(*time).unwrap();
    }
    w.into_inner()
}
