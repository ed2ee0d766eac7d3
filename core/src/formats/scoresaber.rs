//! ScoreSaber replays (`.dat`)
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────────┐
//! │ "ScoreSaber Replay 👌🤠\r\n" │ LZMA-alone stream                    │
//! │ 28 bytes                     │                                      │
//! └──────────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! The decompressed payload starts with a table of nine `i32` section
//! offsets (metadata, poses, heights, notes, scores, combos, multipliers,
//! energies, fps). Each section is a count followed by fixed records and is
//! reached by seeking, never by reading sequentially.

use super::DecodeOptions;
use crate::binary::ReplayReader;
use crate::error::{ReplayError, Result};
use crate::lzma;
use crate::model::{
    EventData, FrameData, Modifiers, NoteCutInfo, NoteEvent, NoteEventType, NoteInfo, Pose, Replay,
    ReplayInfo, ReplayWrapper, RotationAverager, ScoreFrame, ScoringType,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

/// Plain-text file header
pub const HEADER: &[u8] = "ScoreSaber Replay 👌🤠\r\n".as_bytes();

/// Number of entries in the section pointer table
const SECTION_COUNT: usize = 9;

/// Modifier codes, matched exactly against each entry of the modifier list
const MODIFIER_CODES: [(&str, Modifiers); 14] = [
    ("NF", Modifiers::NO_FAIL),
    ("IF", Modifiers::ONE_LIFE),
    ("BE", Modifiers::FOUR_LIVES),
    ("NB", Modifiers::NO_BOMBS),
    ("NO", Modifiers::NO_OBSTACLES),
    ("NA", Modifiers::NO_ARROWS),
    ("DA", Modifiers::DISAPPEARING_ARROWS),
    ("GN", Modifiers::GHOST_NOTES),
    ("SS", Modifiers::SLOWER_SONG),
    ("FS", Modifiers::FASTER_SONG),
    ("SF", Modifiers::SUPER_FAST_SONG),
    ("SA", Modifiers::STRICT_ANGLES),
    ("PM", Modifiers::PRO_MODE),
    ("SC", Modifiers::SMALL_NOTES),
];

/// Sections in pointer-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Metadata,
    Poses,
    Heights,
    Notes,
    Scores,
    Combos,
    Multipliers,
    Energies,
    Fps,
}

impl Section {
    const ALL: [Section; SECTION_COUNT] = [
        Section::Metadata,
        Section::Poses,
        Section::Heights,
        Section::Notes,
        Section::Scores,
        Section::Combos,
        Section::Multipliers,
        Section::Energies,
        Section::Fps,
    ];

    fn name(self) -> &'static str {
        match self {
            Section::Metadata => "metadata",
            Section::Poses => "poses",
            Section::Heights => "heights",
            Section::Notes => "notes",
            Section::Scores => "scores",
            Section::Combos => "combos",
            Section::Multipliers => "multipliers",
            Section::Energies => "energies",
            Section::Fps => "fps",
        }
    }
}

/// Time key with a total order, for merging keyframe streams
#[derive(Debug, Clone, Copy)]
struct TimeKey(f32);

impl PartialEq for TimeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<ReplayWrapper> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(decode(&bytes)?.with_path(path))
}

pub fn decode(bytes: &[u8]) -> Result<ReplayWrapper> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decode a ScoreSaber replay
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<ReplayWrapper> {
    if !bytes.starts_with(HEADER) {
        return Err(ReplayError::format("missing ScoreSaber replay header"));
    }
    let payload = lzma::decompress(&bytes[HEADER.len()..])?;
    let mut reader = ReplayReader::new(&payload);

    let mut offsets = [0usize; SECTION_COUNT];
    for (slot, section) in offsets.iter_mut().zip(Section::ALL) {
        let offset = reader.read_i32()?;
        if offset < 0 || offset as usize > payload.len() {
            return Err(ReplayError::format(format!(
                "{} offset {} outside payload of {} bytes",
                section.name(),
                offset,
                payload.len()
            )));
        }
        *slot = offset as usize;
    }

    let r = &mut reader;
    let metadata = read_metadata(at(r, &offsets, Section::Metadata)?)?;
    let v3 = metadata.version.starts_with("3.");

    let mut poses = read_poses(at(r, &offsets, Section::Poses)?)?;
    let heights = read_pairs(r, &offsets, Section::Heights, |r| r.read_f32())?;
    let notes = read_notes(at(r, &offsets, Section::Notes)?, v3)?;
    let scores = read_scores(at(r, &offsets, Section::Scores)?, v3)?;
    let combos = read_pairs(r, &offsets, Section::Combos, |r| r.read_i32())?;
    let multipliers = read_multipliers(at(r, &offsets, Section::Multipliers)?)?;
    let energies = read_pairs(r, &offsets, Section::Energies, |r| r.read_f32())?;
    let fps = read_pairs(r, &offsets, Section::Fps, |r| r.read_i32())?;

    if poses.is_empty() {
        return Err(ReplayError::data("ScoreSaber replay has no poses"));
    }
    apply_fps(&mut poses, &fps);

    let mut info = metadata.into_info();
    info.score = scores.last().map_or(0, |s| s.score);
    info.has_y_offset = !heights.is_empty();
    let yaw_only = options.yaw_only(info.characteristic.as_deref().unwrap_or(""));
    let mut averager = RotationAverager::new(yaw_only);
    for pose in &poses {
        averager.add(pose.head.rotation);
    }
    info.average_offset = averager.offset();

    let frames = merge_keyframes(&scores, &combos, &energies, &heights);

    log::debug!(
        "decoded ScoreSaber replay: {} poses, {} keyframes, {} notes, {} multiplier changes",
        poses.len(),
        frames.len(),
        notes.len(),
        multipliers
    );

    let frame_data = FrameData {
        info: info.clone(),
        poses,
        frames,
    };

    let replay = if notes.is_empty() {
        Replay::Frame(frame_data)
    } else {
        let mut events = EventData {
            info,
            notes,
            ..Default::default()
        };
        events.rebuild_events();
        Replay::Both(frame_data, events)
    };
    Ok(ReplayWrapper::new(replay))
}

/// Position the reader at the start of a section
fn at<'r, 'a>(
    reader: &'r mut ReplayReader<'a>,
    offsets: &[usize; SECTION_COUNT],
    section: Section,
) -> Result<&'r mut ReplayReader<'a>> {
    reader.seek(offsets[section as usize])?;
    Ok(reader)
}

// ============================================================================
// Sections
// ============================================================================

struct Metadata {
    version: String,
    level_id: String,
    difficulty: i32,
    characteristic: String,
    environment: String,
    modifiers: Vec<String>,
    note_spawn_offset: f32,
    left_handed: bool,
    initial_height: f32,
    room_rotation: f32,
    fail_time: f32,
}

impl Metadata {
    fn into_info(self) -> ReplayInfo {
        let mut modifiers = self
            .modifiers
            .iter()
            .filter_map(|code| {
                MODIFIER_CODES
                    .iter()
                    .find(|(known, _)| known == code)
                    .map(|(_, flag)| *flag)
            })
            .fold(Modifiers::empty(), |acc, flag| acc | flag);
        modifiers.set(Modifiers::LEFT_HANDED, self.left_handed);

        let extra = BTreeMap::from([
            ("recorder_version".to_string(), self.version.clone()),
            ("level_id".to_string(), self.level_id),
            ("difficulty".to_string(), self.difficulty.to_string()),
            ("environment".to_string(), self.environment),
            ("modifiers".to_string(), self.modifiers.join(",")),
            ("note_spawn_offset".to_string(), self.note_spawn_offset.to_string()),
            ("room_rotation".to_string(), self.room_rotation.to_string()),
        ]);

        ReplayInfo {
            modifiers,
            source: format!("ScoreSaber v{}", self.version),
            positions_are_local: false,
            failed: self.fail_time > 0.0,
            fail_time: self.fail_time,
            characteristic: Some(self.characteristic),
            player_height: Some(self.initial_height),
            extra,
            ..Default::default()
        }
    }
}

fn read_metadata(reader: &mut ReplayReader) -> Result<Metadata> {
    let version = reader.read_string()?;
    if !(version.starts_with("2.") || version.starts_with("3.")) {
        return Err(ReplayError::format(format!(
            "unsupported ScoreSaber replay version {:?}",
            version
        )));
    }
    let level_id = reader.read_string()?;
    let difficulty = reader.read_i32()?;
    let characteristic = reader.read_string()?;
    let environment = reader.read_string()?;
    let modifiers = reader.read_string_list()?;
    let note_spawn_offset = reader.read_f32()?;
    let left_handed = reader.read_bool()?;
    let initial_height = reader.read_f32()?;
    let room_rotation = reader.read_f32()?;
    let _room_center = reader.read_vec3()?;
    let fail_time = reader.read_f32()?;

    Ok(Metadata {
        version,
        level_id,
        difficulty,
        characteristic,
        environment,
        modifiers,
        note_spawn_offset,
        left_handed,
        initial_height,
        room_rotation,
        fail_time,
    })
}

fn read_poses(reader: &mut ReplayReader) -> Result<Vec<Pose>> {
    let count = reader.read_count("pose")?;
    let mut poses = Vec::with_capacity(count.min(reader.remaining() / 92 + 1));
    for _ in 0..count {
        let head = reader.read_transform()?;
        let left_hand = reader.read_transform()?;
        let right_hand = reader.read_transform()?;
        let fps = reader.read_i32()?;
        let time = reader.read_f32()?;
        poses.push(Pose {
            time,
            fps,
            head,
            left_hand,
            right_hand,
        });
    }
    Ok(poses)
}

/// Read the `(value, time)` stream stored in `section`
fn read_pairs<'a, T>(
    reader: &mut ReplayReader<'a>,
    offsets: &[usize; SECTION_COUNT],
    section: Section,
    read_value: impl Fn(&mut ReplayReader<'a>) -> Result<T>,
) -> Result<Vec<(T, f32)>> {
    let reader = at(reader, offsets, section)?;
    let count = reader.read_count(section.name())?;
    let mut pairs = Vec::with_capacity(count.min(reader.remaining() / 8 + 1));
    for _ in 0..count {
        let value = read_value(reader)?;
        let time = reader.read_f32()?;
        pairs.push((value, time));
    }
    Ok(pairs)
}

struct ScoreRecord {
    score: i32,
    time: f32,
    max_score: Option<i32>,
}

fn read_scores(reader: &mut ReplayReader, v3: bool) -> Result<Vec<ScoreRecord>> {
    let count = reader.read_count("score")?;
    let mut scores = Vec::with_capacity(count.min(reader.remaining() / 8 + 1));
    for _ in 0..count {
        let score = reader.read_i32()?;
        let time = reader.read_f32()?;
        let max_score = if v3 { Some(reader.read_i32()?) } else { None };
        scores.push(ScoreRecord {
            score,
            time,
            max_score,
        });
    }
    Ok(scores)
}

/// Multiplier changes are validated and counted, playback derives its own
fn read_multipliers(reader: &mut ReplayReader) -> Result<usize> {
    let count = reader.read_count("multiplier")?;
    for _ in 0..count {
        reader.read_i32()?;
        reader.read_f32()?;
        reader.read_f32()?;
    }
    Ok(count)
}

fn read_notes(reader: &mut ReplayReader, v3: bool) -> Result<Vec<NoteEvent>> {
    let count = reader.read_count("note")?;
    let mut notes = Vec::with_capacity(count.min(reader.remaining() / 80 + 1));
    for _ in 0..count {
        let spawn_time = reader.read_f32()?;
        let line_layer = reader.read_i32()?;
        let line_index = reader.read_i32()?;
        let color_type = reader.read_i32()?;
        let cut_direction = reader.read_i32()?;
        let scoring_type = if v3 {
            let _gameplay_type = reader.read_i32()?;
            let scoring_type = reader.read_i32()?;
            let _angle_offset = reader.read_f32()?;
            scoring_type
        } else if color_type == -1 {
            ScoringType::Ignore.as_i32()
        } else {
            ScoringType::Normal.as_i32()
        };

        let event_type = reader.read_i32()?;
        let cut_point = reader.read_vec3()?;
        let cut_normal = reader.read_vec3()?;
        let saber_direction = reader.read_vec3()?;
        let saber_type = reader.read_i32()?;
        let direction_ok = reader.read_bool()?;
        let saber_speed = reader.read_f32()?;
        let cut_angle = reader.read_f32()?;
        let cut_distance_to_center = reader.read_f32()?;
        let cut_direction_deviation = reader.read_f32()?;
        let before_cut_rating = reader.read_f32()?;
        let after_cut_rating = reader.read_f32()?;
        let time = reader.read_f32()?;
        let _time_scale = reader.read_f32()?;
        let _time_scale2 = reader.read_f32()?;

        let event_type = match event_type {
            0 => continue,
            1 => NoteEventType::Good,
            2 => NoteEventType::Bad,
            3 => NoteEventType::Miss,
            4 => NoteEventType::Bomb,
            other => {
                return Err(ReplayError::format(format!("unknown note event type {}", other)));
            }
        };

        let cut_info = event_type.has_cut().then_some(NoteCutInfo {
            speed_ok: true,
            direction_ok,
            saber_type_ok: saber_type == color_type,
            was_cut_too_soon: false,
            saber_speed,
            saber_direction,
            saber_type,
            time_deviation: 0.0,
            cut_direction_deviation,
            cut_point,
            cut_normal,
            cut_distance_to_center,
            cut_angle,
            before_cut_rating,
            after_cut_rating,
        });

        let info = NoteInfo {
            scoring_type,
            line_index,
            line_layer,
            color_type,
            cut_direction,
        };
        notes.push(NoteEvent {
            id: info.key(),
            info,
            event_type,
            cut_info,
            time,
            spawn_time,
        });
    }
    Ok(notes)
}

// ============================================================================
// Merging
// ============================================================================

/// Give each pose the frame rate recorded at or before its time
fn apply_fps(poses: &mut [Pose], fps: &[(i32, f32)]) {
    if fps.is_empty() {
        return;
    }
    let mut next = 0;
    let mut current = None;
    for pose in poses {
        while let Some(&(value, time)) = fps.get(next) {
            if time > pose.time {
                break;
            }
            current = Some(value);
            next += 1;
        }
        if let Some(value) = current {
            pose.fps = value;
        }
    }
}

/// Union the per-field streams into one time-ordered keyframe list
fn merge_keyframes(
    scores: &[ScoreRecord],
    combos: &[(i32, f32)],
    energies: &[(f32, f32)],
    heights: &[(f32, f32)],
) -> Vec<ScoreFrame> {
    let mut frames: BTreeMap<TimeKey, ScoreFrame> = BTreeMap::new();
    fn frame_at(frames: &mut BTreeMap<TimeKey, ScoreFrame>, time: f32) -> &mut ScoreFrame {
        frames.entry(TimeKey(time)).or_insert(ScoreFrame {
            time,
            ..Default::default()
        })
    }

    for record in scores {
        let frame = frame_at(&mut frames, record.time);
        frame.score = Some(record.score);
        if let Some(max) = record.max_score.filter(|&m| m > 0) {
            frame.percent = Some(record.score as f32 / max as f32);
        }
    }
    for &(combo, time) in combos {
        frame_at(&mut frames, time).combo = Some(combo);
    }
    for &(energy, time) in energies {
        frame_at(&mut frames, time).energy = Some(energy);
    }
    for &(height, time) in heights {
        frame_at(&mut frames, time).offset = Some(height);
    }

    frames.into_values().collect()
}
