//! Legacy frame replays (`.reqlay`, versions 1 to 6)
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────┬──────────────────────────┐
//! │ magic: 3B    │ version: i32 │ info block │ keyframe records ... EOF │
//! │ A1 D2 45     │ 2..=6        │            │ fixed size per version   │
//! └──────────────┴──────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! Version 1 files have no magic and no version; the info block starts at
//! offset 0. Every record is one pose plus one score keyframe.

use crate::binary::{ReplayReader, ReplayWriter};
use crate::error::{ReplayError, Result};
use crate::model::{
    FrameData, Modifiers, Pose, Practice, Replay, ReplayInfo, ReplayWrapper, RotationAverager,
    ScoreFrame, Transform,
};
use glam::{EulerRot, Quat, Vec3};
use std::path::Path;

/// File magic of versions 2 and later
pub const MAGIC: [u8; 3] = [0xA1, 0xD2, 0x45];

/// Newest version, the one [`encode`] writes
pub const LATEST_VERSION: i32 = 6;

/// Modifier order of version 1
const MODIFIERS_V1: [Modifiers; 10] = [
    Modifiers::NO_FAIL,
    Modifiers::NO_OBSTACLES,
    Modifiers::NO_BOMBS,
    Modifiers::NO_ARROWS,
    Modifiers::SLOWER_SONG,
    Modifiers::DISAPPEARING_ARROWS,
    Modifiers::GHOST_NOTES,
    Modifiers::FASTER_SONG,
    Modifiers::ONE_LIFE,
    Modifiers::FOUR_LIVES,
];

/// Modifier order of versions 2 to 4
const MODIFIERS_V2: [Modifiers; 14] = [
    Modifiers::NO_FAIL,
    Modifiers::NO_OBSTACLES,
    Modifiers::NO_BOMBS,
    Modifiers::NO_ARROWS,
    Modifiers::SLOWER_SONG,
    Modifiers::DISAPPEARING_ARROWS,
    Modifiers::GHOST_NOTES,
    Modifiers::FASTER_SONG,
    Modifiers::ONE_LIFE,
    Modifiers::FOUR_LIVES,
    Modifiers::STRICT_ANGLES,
    Modifiers::PRO_MODE,
    Modifiers::SMALL_NOTES,
    Modifiers::SUPER_FAST_SONG,
];

/// Modifier order of versions 5 and 6 (alphabetical)
const MODIFIERS_V5: [Modifiers; 15] = [
    Modifiers::DISAPPEARING_ARROWS,
    Modifiers::FASTER_SONG,
    Modifiers::FOUR_LIVES,
    Modifiers::GHOST_NOTES,
    Modifiers::LEFT_HANDED,
    Modifiers::NO_ARROWS,
    Modifiers::NO_BOMBS,
    Modifiers::NO_FAIL,
    Modifiers::NO_OBSTACLES,
    Modifiers::ONE_LIFE,
    Modifiers::PRO_MODE,
    Modifiers::SLOWER_SONG,
    Modifiers::SMALL_NOTES,
    Modifiers::STRICT_ANGLES,
    Modifiers::SUPER_FAST_SONG,
];

fn modifier_order(version: i32) -> &'static [Modifiers] {
    match version {
        1 => &MODIFIERS_V1,
        2..=4 => &MODIFIERS_V2,
        _ => &MODIFIERS_V5,
    }
}

/// Byte size of one keyframe record
fn record_size(version: i32) -> usize {
    match version {
        1..=3 => 4 + 3 * 24 + 12,
        4 => 4 + 3 * 24 + 16,
        5 => 4 + 3 * 28 + 16,
        _ => 4 + 3 * 28 + 20,
    }
}

/// Whether the buffer starts with the legacy magic
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

pub fn decode_file(path: impl AsRef<Path>) -> Result<ReplayWrapper> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(decode(&bytes)?.with_path(path))
}

/// Decode a legacy replay of any version
pub fn decode(bytes: &[u8]) -> Result<ReplayWrapper> {
    let mut reader = ReplayReader::new(bytes);

    let version = if has_magic(bytes) {
        reader.skip(MAGIC.len())?;
        let version = reader.read_i32()?;
        if !(1..=LATEST_VERSION).contains(&version) {
            return Err(ReplayError::format(format!(
                "unsupported legacy replay version {}",
                version
            )));
        }
        version
    } else {
        1
    };

    let mut info = read_info(&mut reader, version)?;

    let size = record_size(version);
    let mut poses = Vec::with_capacity(reader.remaining() / size);
    let mut frames = Vec::with_capacity(reader.remaining() / size);
    while !reader.is_eof() {
        if reader.remaining() < size {
            log::warn!(
                "dropping {} trailing bytes of a partial v{} keyframe record",
                reader.remaining(),
                version
            );
            break;
        }
        let (pose, frame) = read_record(&mut reader, version)?;
        poses.push(pose);
        frames.push(frame);
    }

    if poses.is_empty() {
        return Err(ReplayError::data("legacy replay has no keyframes"));
    }

    let mut averager = RotationAverager::new(false);
    for pose in &poses {
        averager.add(pose.head.rotation);
    }
    info.average_offset = averager.offset();

    log::debug!(
        "decoded legacy v{} replay: {} keyframes, score {}",
        version,
        poses.len(),
        info.score
    );

    Ok(ReplayWrapper::new(Replay::Frame(FrameData {
        info,
        poses,
        frames,
    })))
}

fn read_info(reader: &mut ReplayReader, version: i32) -> Result<ReplayInfo> {
    let order = modifier_order(version);
    let mut flags = Vec::with_capacity(order.len());
    for _ in order {
        flags.push(reader.read_bool()?);
    }

    let mut info = ReplayInfo {
        modifiers: Modifiers::from_ordered(order, &flags),
        timestamp: reader.read_i64()?,
        score: reader.read_i32()?,
        source: format!("Reqlay v{}", version),
        has_y_offset: version >= 6,
        ..Default::default()
    };

    if version >= 3 {
        info.failed = reader.read_bool()?;
        info.fail_time = reader.read_f32()?;
    }

    if version >= 5 {
        let reached_zero = reader.read_bool()?;
        let zero_time = reader.read_f32()?;
        if reached_zero {
            info.reached_zero_energy = Some(zero_time);
        }
    }

    if version >= 6 {
        let start_time = reader.read_f32()?;
        let speed = reader.read_f32()?;
        if start_time != 0.0 || speed != 1.0 {
            info.practice = Some(Practice { start_time, speed });
        }
    }

    Ok(info)
}

fn read_record(reader: &mut ReplayReader, version: i32) -> Result<(Pose, ScoreFrame)> {
    let time = reader.read_f32()?;

    let (head, left_hand, right_hand) = if version >= 5 {
        (
            reader.read_transform()?,
            reader.read_transform()?,
            reader.read_transform()?,
        )
    } else {
        let mut head = read_euler_transform(reader)?;
        let left_hand = read_euler_transform(reader)?;
        let right_hand = read_euler_transform(reader)?;
        if version == 1 {
            // v1 recorded the head pitched down by a quarter turn
            head.rotation = (head.rotation * Quat::from_rotation_x(90f32.to_radians())).normalize();
        }
        (head, left_hand, right_hand)
    };

    let mut frame = ScoreFrame {
        time,
        score: Some(reader.read_i32()?),
        percent: Some(reader.read_f32()?),
        combo: Some(reader.read_i32()?),
        ..Default::default()
    };
    if version >= 4 {
        frame.energy = Some(reader.read_f32()?);
    }
    if version >= 6 {
        frame.offset = Some(reader.read_f32()?);
    }

    let pose = Pose {
        time,
        fps: 0,
        head,
        left_hand,
        right_hand,
    };
    Ok((pose, frame))
}

/// Position followed by Unity euler angles in degrees
fn read_euler_transform(reader: &mut ReplayReader) -> Result<Transform> {
    let position = reader.read_vec3()?;
    let euler = reader.read_vec3()?;
    Ok(Transform {
        position,
        rotation: euler_to_quat(euler),
    })
}

/// Unity applies Z, then X, then Y
fn euler_to_quat(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode keyframe data as a version 6 file
///
/// Keyframe fields the source did not record are written as zero.
pub fn encode(data: &FrameData) -> Vec<u8> {
    let size = 3 + 4 + 15 + 8 + 4 + 5 + 5 + 8 + data.poses.len() * record_size(LATEST_VERSION);
    let mut writer = ReplayWriter::new(Vec::with_capacity(size));
    // Writes into a Vec never fail
    let _ = write_v6(&mut writer, data);
    writer.into_inner()
}

fn write_v6(writer: &mut ReplayWriter<Vec<u8>>, data: &FrameData) -> std::io::Result<()> {
    let info = &data.info;
    writer.write_bytes(&MAGIC)?;
    writer.write_i32(LATEST_VERSION)?;
    for flag in MODIFIERS_V5 {
        writer.write_bool(info.modifiers.contains(flag))?;
    }
    writer.write_i64(info.timestamp)?;
    writer.write_i32(info.score)?;
    writer.write_bool(info.failed)?;
    writer.write_f32(info.fail_time)?;
    writer.write_bool(info.reached_zero_energy.is_some())?;
    writer.write_f32(info.reached_zero_energy.unwrap_or(0.0))?;
    let practice = info.practice.unwrap_or(Practice {
        start_time: 0.0,
        speed: 1.0,
    });
    writer.write_f32(practice.start_time)?;
    writer.write_f32(practice.speed)?;

    for (pose, frame) in data.poses.iter().zip(&data.frames) {
        writer.write_f32(pose.time)?;
        writer.write_transform(&pose.head)?;
        writer.write_transform(&pose.left_hand)?;
        writer.write_transform(&pose.right_hand)?;
        writer.write_i32(frame.score.unwrap_or(0))?;
        writer.write_f32(frame.percent.unwrap_or(0.0))?;
        writer.write_i32(frame.combo.unwrap_or(0))?;
        writer.write_f32(frame.energy.unwrap_or(0.0))?;
        writer.write_f32(frame.offset.unwrap_or(0.0))?;
    }
    Ok(())
}
