//! BSOR event replays (`.bsor`)
//!
//! ```text
//! ┌─────────────┬─────────────┬──────────────────────────────────────────┐
//! │ magic: i32  │ version: i8 │ sections: tag u8 + payload, 0..=5 in     │
//! │ 0x442D3D69  │ 1           │ order, then optional 6 and 7 until EOF   │
//! └─────────────┴─────────────┴──────────────────────────────────────────┘
//! ```
//!
//! | Tag | Section            | Payload                                        |
//! |-----|--------------------|------------------------------------------------|
//! | 0   | info               | header strings and numbers                     |
//! | 1   | frames             | count, (time, fps, head, left, right)          |
//! | 2   | notes              | count, (id, time, spawn, type, [cut info])     |
//! | 3   | walls              | count, (id, energy, time, spawn)               |
//! | 4   | heights            | count, (height, time)                          |
//! | 5   | pauses             | count, (duration i64, time)                    |
//! | 6   | controller offsets | left transform, right transform                |
//! | 7   | custom data        | count, (key string, len i32, bytes)            |
//!
//! Known recorder bugs are repaired while decoding rather than rejected.

use super::DecodeOptions;
use crate::binary::{ReplayReader, ReplayWriter};
use crate::error::{ReplayError, Result};
use crate::model::{
    ControllerOffsets, EnergyCounter, EventData, HeightEvent, Modifiers, NoteCutInfo, NoteEvent,
    NoteEventType, NoteInfo, NoteKind, PauseEvent, Pose, Practice, Replay, ReplayInfo,
    ReplayWrapper, RotationAverager, WALL_DRAIN_PER_SECOND, WallEvent, covered_seconds,
    energy_delta,
};
use std::collections::BTreeMap;
use std::path::Path;

/// File magic, stored as a little-endian `i32`
pub const MAGIC: i32 = 0x442D3D69;

/// Only supported file version
pub const VERSION: i8 = 1;

/// Highest plausible saber speed; anything above is recorder noise
const MAX_SABER_SPEED: f32 = 100.0;

/// Modifier codes, matched as substrings of the modifier text
const MODIFIER_CODES: [(&str, Modifiers); 14] = [
    ("DA", Modifiers::DISAPPEARING_ARROWS),
    ("FS", Modifiers::FASTER_SONG),
    ("SS", Modifiers::SLOWER_SONG),
    ("SF", Modifiers::SUPER_FAST_SONG),
    ("GN", Modifiers::GHOST_NOTES),
    ("NA", Modifiers::NO_ARROWS),
    ("NB", Modifiers::NO_BOMBS),
    ("NF", Modifiers::NO_FAIL),
    ("NO", Modifiers::NO_OBSTACLES),
    ("IF", Modifiers::ONE_LIFE),
    ("BE", Modifiers::FOUR_LIVES),
    ("SA", Modifiers::STRICT_ANGLES),
    ("PM", Modifiers::PRO_MODE),
    ("SC", Modifiers::SMALL_NOTES),
];

/// Platform whose recorder stored wall exit times in the energy slot
const EXIT_TIME_PLATFORM: &str = "oculus";

// Keys under which the header text is kept in `ReplayInfo::extra`
const KEY_RECORDER_VERSION: &str = "recorder_version";
const KEY_GAME_VERSION: &str = "game_version";
const KEY_PLAYER_ID: &str = "player_id";
const KEY_PLATFORM: &str = "platform";
const KEY_TRACKING_SYSTEM: &str = "tracking_system";
const KEY_HMD: &str = "hmd";
const KEY_CONTROLLER: &str = "controller";
const KEY_HASH: &str = "hash";
const KEY_SONG_NAME: &str = "song_name";
const KEY_MAPPER: &str = "mapper";
const KEY_DIFFICULTY: &str = "difficulty";
const KEY_ENVIRONMENT: &str = "environment";
const KEY_MODIFIERS: &str = "modifiers";

mod tag {
    pub const INFO: u8 = 0;
    pub const FRAMES: u8 = 1;
    pub const NOTES: u8 = 2;
    pub const WALLS: u8 = 3;
    pub const HEIGHTS: u8 = 4;
    pub const PAUSES: u8 = 5;
    pub const CONTROLLER_OFFSETS: u8 = 6;
    pub const CUSTOM_DATA: u8 = 7;
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<ReplayWrapper> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(decode(&bytes)?.with_path(path))
}

pub fn decode(bytes: &[u8]) -> Result<ReplayWrapper> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decode a BSOR file
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> Result<ReplayWrapper> {
    let mut reader = ReplayReader::new(bytes);

    let magic = reader.read_i32()?;
    if magic != MAGIC {
        return Err(ReplayError::format(format!("bad BSOR magic {:#010x}", magic)));
    }
    let version = reader.read_u8()? as i8;
    if version != VERSION {
        return Err(ReplayError::format(format!("unsupported BSOR version {}", version)));
    }

    let header = read_section(&mut reader, tag::INFO, "info", read_info)?;
    let mut poses = read_section(&mut reader, tag::FRAMES, "frames", read_frames)?;
    let (notes, needs_recalculation) = read_section(&mut reader, tag::NOTES, "notes", read_notes)?;
    let raw_walls = read_section(&mut reader, tag::WALLS, "walls", read_walls)?;
    let heights = read_section(&mut reader, tag::HEIGHTS, "heights", read_heights)?;
    let pauses = read_section(&mut reader, tag::PAUSES, "pauses", read_pauses)?;

    let (controller_offsets, custom_data) = read_optional_sections(&mut reader);

    if poses.is_empty() {
        return Err(ReplayError::data("BSOR replay has no frames"));
    }

    repair_duplicate_frames(&mut poses);

    let mut info = header.into_info();
    let yaw_only = options.yaw_only(info.characteristic.as_deref().unwrap_or(""));
    let mut averager = RotationAverager::new(yaw_only);
    for pose in &poses {
        averager.add(pose.head.rotation);
    }
    info.average_offset = averager.offset();

    let exit_in_energy_slot = info.extra(KEY_PLATFORM) == Some(EXIT_TIME_PLATFORM);
    let walls = resolve_wall_ends(raw_walls, &notes, info.modifiers, exit_in_energy_slot)?;

    log::debug!(
        "decoded BSOR replay: {} frames, {} notes, {} walls, recalculation {}",
        poses.len(),
        notes.len(),
        walls.len(),
        needs_recalculation
    );

    let mut data = EventData {
        info,
        poses,
        notes,
        walls,
        heights,
        pauses,
        needs_recalculation,
        controller_offsets,
        custom_data,
        ..Default::default()
    };
    data.rebuild_events();

    Ok(ReplayWrapper::new(Replay::Event(data)))
}

/// Read one mandatory section, which must carry the expected tag
fn read_section<'a, T>(
    reader: &mut ReplayReader<'a>,
    expected: u8,
    name: &str,
    read: impl FnOnce(&mut ReplayReader<'a>) -> Result<T>,
) -> Result<T> {
    let section = reader.read_u8().and_then(|found| {
        if found != expected {
            return Err(ReplayError::format(format!(
                "expected section tag {}, found {}",
                expected, found
            )));
        }
        read(reader)
    });
    section.map_err(|error| match error {
        ReplayError::Format(msg) => ReplayError::Format(format!("{} in {} section", msg, name)),
        other => other,
    })
}

// ============================================================================
// Sections
// ============================================================================

/// Raw info section
struct Header {
    version: String,
    game_version: String,
    timestamp: String,
    player_id: String,
    player_name: String,
    platform: String,
    tracking_system: String,
    hmd: String,
    controller: String,
    hash: String,
    song_name: String,
    mapper: String,
    difficulty: String,
    score: i32,
    mode: String,
    environment: String,
    modifiers: String,
    jump_distance: f32,
    left_handed: bool,
    height: f32,
    start_time: f32,
    fail_time: f32,
    speed: f32,
}

impl Header {
    fn into_info(self) -> ReplayInfo {
        let mut modifiers = Modifiers::from_codes(&MODIFIER_CODES, &self.modifiers);
        modifiers.set(Modifiers::LEFT_HANDED, self.left_handed);

        let practice = (self.start_time > 0.0 || (self.speed != 0.0 && self.speed != 1.0))
            .then_some(Practice {
                start_time: self.start_time,
                speed: self.speed,
            });

        let extra = BTreeMap::from([
            (KEY_RECORDER_VERSION.to_string(), self.version.clone()),
            (KEY_GAME_VERSION.to_string(), self.game_version),
            (KEY_PLAYER_ID.to_string(), self.player_id.clone()),
            (KEY_PLATFORM.to_string(), self.platform),
            (KEY_TRACKING_SYSTEM.to_string(), self.tracking_system),
            (KEY_HMD.to_string(), self.hmd),
            (KEY_CONTROLLER.to_string(), self.controller),
            (KEY_HASH.to_string(), self.hash),
            (KEY_SONG_NAME.to_string(), self.song_name),
            (KEY_MAPPER.to_string(), self.mapper),
            (KEY_DIFFICULTY.to_string(), self.difficulty),
            (KEY_ENVIRONMENT.to_string(), self.environment),
            (KEY_MODIFIERS.to_string(), self.modifiers),
        ]);

        ReplayInfo {
            timestamp: self.timestamp.trim().parse().unwrap_or(0),
            score: self.score,
            modifiers,
            source: format!("BSOR {}", self.version),
            positions_are_local: true,
            has_y_offset: true,
            player_ok: !self.player_id.is_empty(),
            player_name: Some(self.player_name),
            practice,
            failed: self.fail_time > 0.0,
            fail_time: self.fail_time,
            jump_distance: Some(self.jump_distance),
            characteristic: Some(self.mode),
            player_height: Some(self.height),
            extra,
            ..Default::default()
        }
    }
}

fn read_info(reader: &mut ReplayReader) -> Result<Header> {
    Ok(Header {
        version: reader.read_string()?,
        game_version: reader.read_string()?,
        timestamp: reader.read_string()?,
        player_id: reader.read_string()?,
        player_name: reader.read_string_tolerant()?,
        platform: reader.read_string()?,
        tracking_system: reader.read_string()?,
        hmd: reader.read_string()?,
        controller: reader.read_string()?,
        hash: reader.read_string()?,
        song_name: reader.read_string_tolerant()?,
        mapper: reader.read_string_tolerant()?,
        difficulty: reader.read_string()?,
        score: reader.read_i32()?,
        mode: reader.read_string()?,
        environment: reader.read_string()?,
        modifiers: reader.read_string()?,
        jump_distance: reader.read_f32()?,
        left_handed: reader.read_bool()?,
        height: reader.read_f32()?,
        start_time: reader.read_f32()?,
        fail_time: reader.read_f32()?,
        speed: reader.read_f32()?,
    })
}

fn read_frames(reader: &mut ReplayReader) -> Result<Vec<Pose>> {
    let count = reader.read_count("frame")?;
    let mut poses = Vec::with_capacity(count.min(reader.remaining() / 92 + 1));
    for _ in 0..count {
        poses.push(Pose {
            time: reader.read_f32()?,
            fps: reader.read_i32()?,
            head: reader.read_transform()?,
            left_hand: reader.read_transform()?,
            right_hand: reader.read_transform()?,
        });
    }
    Ok(poses)
}

/// Notes plus whether any key needs beatmap recalculation
fn read_notes(reader: &mut ReplayReader) -> Result<(Vec<NoteEvent>, bool)> {
    let count = reader.read_count("note")?;
    let mut notes = Vec::with_capacity(count.min(reader.remaining() / 16 + 1));
    let mut needs_recalculation = false;

    for _ in 0..count {
        let id = reader.read_i32()?;
        let time = reader.read_f32()?;
        let spawn_time = reader.read_f32()?;
        let event_type = match reader.read_i32()? {
            0 => NoteEventType::Good,
            1 => NoteEventType::Bad,
            2 => NoteEventType::Miss,
            3 => NoteEventType::Bomb,
            other => {
                return Err(ReplayError::format(format!("unknown note event type {}", other)));
            }
        };

        let info = NoteInfo::from_key(id);
        let ambiguous = id < 0 || info.is_ambiguous();
        needs_recalculation |= ambiguous;

        let cut_info = if event_type.has_cut() {
            let mut cut = read_cut_info(reader)?;
            let speed_reset = repair_saber_speed(&mut cut);
            if ambiguous && (!(0..=1).contains(&cut.saber_type) || speed_reset) {
                cut = NoteCutInfo::synthetic(event_type == NoteEventType::Good, cut.saber_type);
            }
            Some(cut)
        } else {
            None
        };

        notes.push(NoteEvent {
            id,
            info,
            event_type,
            cut_info,
            time,
            spawn_time,
        });
    }
    Ok((notes, needs_recalculation))
}

fn read_cut_info(reader: &mut ReplayReader) -> Result<NoteCutInfo> {
    Ok(NoteCutInfo {
        speed_ok: reader.read_bool()?,
        direction_ok: reader.read_bool()?,
        saber_type_ok: reader.read_bool()?,
        was_cut_too_soon: reader.read_bool()?,
        saber_speed: reader.read_f32()?,
        saber_direction: reader.read_vec3()?,
        saber_type: reader.read_i32()?,
        time_deviation: reader.read_f32()?,
        cut_direction_deviation: reader.read_f32()?,
        cut_point: reader.read_vec3()?,
        cut_normal: reader.read_vec3()?,
        cut_distance_to_center: reader.read_f32()?,
        cut_angle: reader.read_f32()?,
        before_cut_rating: reader.read_f32()?,
        after_cut_rating: reader.read_f32()?,
    })
}

/// Reset an implausible saber speed, returning whether it was reset
fn repair_saber_speed(cut: &mut NoteCutInfo) -> bool {
    let speed = cut.saber_speed;
    if speed.is_finite() && (0.0..=MAX_SABER_SPEED).contains(&speed) {
        return false;
    }
    cut.saber_speed = NoteCutInfo::UNKNOWN_SPEED;
    true
}

fn read_walls(reader: &mut ReplayReader) -> Result<Vec<WallEvent>> {
    let count = reader.read_count("wall")?;
    let mut walls = Vec::with_capacity(count.min(reader.remaining() / 16 + 1));
    for _ in 0..count {
        let (line_index, obstacle_type, width) = WallEvent::id_parts(reader.read_i32()?);
        let energy = reader.read_f32()?;
        let time = reader.read_f32()?;
        let spawn_time = reader.read_f32()?;
        walls.push(WallEvent {
            line_index,
            obstacle_type,
            width,
            energy,
            time,
            end_time: time,
            spawn_time,
        });
    }
    Ok(walls)
}

fn read_heights(reader: &mut ReplayReader) -> Result<Vec<HeightEvent>> {
    let count = reader.read_count("height")?;
    let mut heights = Vec::with_capacity(count.min(reader.remaining() / 8 + 1));
    for _ in 0..count {
        heights.push(HeightEvent {
            height: reader.read_f32()?,
            time: reader.read_f32()?,
        });
    }
    Ok(heights)
}

fn read_pauses(reader: &mut ReplayReader) -> Result<Vec<PauseEvent>> {
    let count = reader.read_count("pause")?;
    let mut pauses = Vec::with_capacity(count.min(reader.remaining() / 12 + 1));
    for _ in 0..count {
        pauses.push(PauseEvent {
            duration: reader.read_i64()?,
            time: reader.read_f32()?,
        });
    }
    Ok(pauses)
}

/// Read trailing optional sections until EOF
///
/// Anything that fails to parse here ends the file; the mandatory data is
/// already complete.
fn read_optional_sections(
    reader: &mut ReplayReader,
) -> (Option<ControllerOffsets>, BTreeMap<String, Vec<u8>>) {
    let mut offsets = None;
    let mut custom_data = BTreeMap::new();

    while !reader.is_eof() {
        let section = reader.read_u8().and_then(|found| match found {
            tag::CONTROLLER_OFFSETS => {
                offsets = Some(ControllerOffsets {
                    left: reader.read_transform()?,
                    right: reader.read_transform()?,
                });
                Ok(())
            }
            tag::CUSTOM_DATA => read_custom_data(reader, &mut custom_data),
            other => Err(ReplayError::format(format!("unknown optional section tag {}", other))),
        });
        if let Err(e) = section {
            log::warn!("ignoring trailing BSOR data: {}", e);
            break;
        }
    }

    (offsets, custom_data)
}

fn read_custom_data(reader: &mut ReplayReader, into: &mut BTreeMap<String, Vec<u8>>) -> Result<()> {
    let count = reader.read_count("custom data")?;
    for _ in 0..count {
        let key = reader.read_string()?;
        let len = reader.read_count("custom data byte")?;
        let value = reader.read_bytes(len)?;
        into.insert(key, value.to_vec());
    }
    Ok(())
}

// ============================================================================
// Repairs
// ============================================================================

/// Undo the multi-avatar recorder bug that wrote every frame twice
///
/// The bug is detected at the first frame with a non-zero time: if the next
/// frame has the same time, every later frame repeating the timestamp of the
/// frame before it is dropped. Zero-time frames ahead of the song are kept.
fn repair_duplicate_frames(poses: &mut Vec<Pose>) {
    let Some(first) = poses.iter().position(|p| p.time != 0.0) else {
        return;
    };
    let duplicated = poses
        .get(first + 1)
        .is_some_and(|next| next.time == poses[first].time);
    if !duplicated {
        return;
    }

    let before = poses.len();
    let mut tail = poses.split_off(first);
    tail.dedup_by(|later, kept| later.time == kept.time);
    poses.append(&mut tail);
    log::warn!("compacted duplicated BSOR frames: {} -> {}", before, poses.len());
}

/// Fill in wall exit times
///
/// Quest recordings stored the exit time directly in the energy slot. Every
/// other recording stored the energy at exit, and the exit time is rebuilt by
/// simulating energy up to the entry and dividing the missing energy by the
/// wall drain rate.
fn resolve_wall_ends(
    mut walls: Vec<WallEvent>,
    notes: &[NoteEvent],
    modifiers: Modifiers,
    exit_in_energy_slot: bool,
) -> Result<Vec<WallEvent>> {
    if let Some(wall) = walls.iter().find(|w| !w.time.is_finite()) {
        return Err(ReplayError::data(format!("wall with non-finite time {}", wall.time)));
    }

    if exit_in_energy_slot {
        for wall in &mut walls {
            wall.end_time = wall.energy;
        }
    } else {
        reconstruct_wall_ends(&mut walls, notes, modifiers);
    }

    if let Some(wall) = walls.iter().find(|w| w.end_time.is_nan() || w.end_time < w.time) {
        return Err(ReplayError::data(format!(
            "wall at {} ends before it starts ({})",
            wall.time, wall.end_time
        )));
    }
    Ok(walls)
}

fn reconstruct_wall_ends(walls: &mut [WallEvent], notes: &[NoteEvent], modifiers: Modifiers) {
    let mut note_order: Vec<&NoteEvent> = notes.iter().collect();
    note_order.sort_by(|a, b| a.time.total_cmp(&b.time));
    let mut wall_order: Vec<usize> = (0..walls.len()).collect();
    wall_order.sort_by(|&a, &b| walls[a].time.total_cmp(&walls[b].time));

    let mut counter = EnergyCounter::new(modifiers);
    let mut resolved: Vec<(f32, f32)> = Vec::with_capacity(walls.len());
    let mut next_note = 0;
    let mut clock = f32::NEG_INFINITY;

    for index in wall_order {
        let entry = walls[index].time;

        while let Some(note) = note_order.get(next_note).filter(|n| n.time < entry) {
            let drained = covered_seconds(resolved.iter().copied(), clock, note.time);
            counter.drain(drained, note.time);
            let kind = NoteKind::of(&note.info, note.event_type);
            counter.apply(energy_delta(kind, note.event_type), note.time);
            clock = clock.max(note.time);
            next_note += 1;
        }
        counter.drain(covered_seconds(resolved.iter().copied(), clock, entry), entry);
        clock = clock.max(entry);

        let missing = (counter.energy() - walls[index].energy).max(0.0);
        let wall = &mut walls[index];
        wall.end_time = wall.time + missing / WALL_DRAIN_PER_SECOND;
        resolved.push((wall.time, wall.end_time));
        counter.enter_wall(wall.time);
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode event data as a BSOR v1 file
///
/// Header text comes from [`ReplayInfo::extra`]; missing entries are written
/// empty. Wall energy slots are written as stored.
pub fn encode(data: &EventData) -> Vec<u8> {
    let mut writer = ReplayWriter::new(Vec::with_capacity(
        256 + data.poses.len() * 92 + data.notes.len() * 99 + data.walls.len() * 16,
    ));
    // Writes into a Vec never fail
    let _ = write_bsor(&mut writer, data);
    writer.into_inner()
}

fn write_bsor(writer: &mut ReplayWriter<Vec<u8>>, data: &EventData) -> std::io::Result<()> {
    let info = &data.info;
    let text = |key: &str| info.extra(key).unwrap_or("");

    writer.write_i32(MAGIC)?;
    writer.write_u8(VERSION as u8)?;

    writer.write_u8(tag::INFO)?;
    writer.write_string(text(KEY_RECORDER_VERSION))?;
    writer.write_string(text(KEY_GAME_VERSION))?;
    writer.write_string(&info.timestamp.to_string())?;
    writer.write_string(text(KEY_PLAYER_ID))?;
    writer.write_string(info.player_name.as_deref().unwrap_or(""))?;
    writer.write_string(text(KEY_PLATFORM))?;
    writer.write_string(text(KEY_TRACKING_SYSTEM))?;
    writer.write_string(text(KEY_HMD))?;
    writer.write_string(text(KEY_CONTROLLER))?;
    writer.write_string(text(KEY_HASH))?;
    writer.write_string(text(KEY_SONG_NAME))?;
    writer.write_string(text(KEY_MAPPER))?;
    writer.write_string(text(KEY_DIFFICULTY))?;
    writer.write_i32(info.score)?;
    writer.write_string(info.characteristic.as_deref().unwrap_or(""))?;
    writer.write_string(text(KEY_ENVIRONMENT))?;
    match info.extra(KEY_MODIFIERS) {
        Some(modifiers) => writer.write_string(modifiers)?,
        None => writer.write_string(&modifier_codes(info.modifiers))?,
    }
    writer.write_f32(info.jump_distance.unwrap_or(0.0))?;
    writer.write_bool(info.modifiers.contains(Modifiers::LEFT_HANDED))?;
    writer.write_f32(info.player_height.unwrap_or(0.0))?;
    let practice = info.practice.unwrap_or(Practice {
        start_time: 0.0,
        speed: 1.0,
    });
    writer.write_f32(practice.start_time)?;
    writer.write_f32(info.fail_time)?;
    writer.write_f32(practice.speed)?;

    writer.write_u8(tag::FRAMES)?;
    writer.write_i32(data.poses.len() as i32)?;
    for pose in &data.poses {
        writer.write_f32(pose.time)?;
        writer.write_i32(pose.fps)?;
        writer.write_transform(&pose.head)?;
        writer.write_transform(&pose.left_hand)?;
        writer.write_transform(&pose.right_hand)?;
    }

    writer.write_u8(tag::NOTES)?;
    writer.write_i32(data.notes.len() as i32)?;
    for note in &data.notes {
        writer.write_i32(note.id)?;
        writer.write_f32(note.time)?;
        writer.write_f32(note.spawn_time)?;
        writer.write_i32(match note.event_type {
            NoteEventType::Good => 0,
            NoteEventType::Bad => 1,
            NoteEventType::Miss => 2,
            NoteEventType::Bomb => 3,
        })?;
        if note.event_type.has_cut() {
            let good = note.event_type == NoteEventType::Good;
            let cut = note
                .cut_info
                .unwrap_or_else(|| NoteCutInfo::synthetic(good, 0));
            write_cut_info(writer, &cut)?;
        }
    }

    writer.write_u8(tag::WALLS)?;
    writer.write_i32(data.walls.len() as i32)?;
    for wall in &data.walls {
        writer.write_i32(wall.id())?;
        writer.write_f32(wall.energy)?;
        writer.write_f32(wall.time)?;
        writer.write_f32(wall.spawn_time)?;
    }

    writer.write_u8(tag::HEIGHTS)?;
    writer.write_i32(data.heights.len() as i32)?;
    for height in &data.heights {
        writer.write_f32(height.height)?;
        writer.write_f32(height.time)?;
    }

    writer.write_u8(tag::PAUSES)?;
    writer.write_i32(data.pauses.len() as i32)?;
    for pause in &data.pauses {
        writer.write_i64(pause.duration)?;
        writer.write_f32(pause.time)?;
    }

    if let Some(offsets) = &data.controller_offsets {
        writer.write_u8(tag::CONTROLLER_OFFSETS)?;
        writer.write_transform(&offsets.left)?;
        writer.write_transform(&offsets.right)?;
    }

    if !data.custom_data.is_empty() {
        writer.write_u8(tag::CUSTOM_DATA)?;
        writer.write_i32(data.custom_data.len() as i32)?;
        for (key, value) in &data.custom_data {
            writer.write_string(key)?;
            writer.write_i32(value.len() as i32)?;
            writer.write_bytes(value)?;
        }
    }
    Ok(())
}

fn write_cut_info(writer: &mut ReplayWriter<Vec<u8>>, cut: &NoteCutInfo) -> std::io::Result<()> {
    writer.write_bool(cut.speed_ok)?;
    writer.write_bool(cut.direction_ok)?;
    writer.write_bool(cut.saber_type_ok)?;
    writer.write_bool(cut.was_cut_too_soon)?;
    writer.write_f32(cut.saber_speed)?;
    writer.write_vec3(cut.saber_direction)?;
    writer.write_i32(cut.saber_type)?;
    writer.write_f32(cut.time_deviation)?;
    writer.write_f32(cut.cut_direction_deviation)?;
    writer.write_vec3(cut.cut_point)?;
    writer.write_vec3(cut.cut_normal)?;
    writer.write_f32(cut.cut_distance_to_center)?;
    writer.write_f32(cut.cut_angle)?;
    writer.write_f32(cut.before_cut_rating)?;
    writer.write_f32(cut.after_cut_rating)
}

fn modifier_codes(modifiers: Modifiers) -> String {
    MODIFIER_CODES
        .iter()
        .filter(|(_, flag)| modifiers.contains(*flag))
        .map(|(code, _)| *code)
        .collect::<Vec<_>>()
        .join(",")
}
