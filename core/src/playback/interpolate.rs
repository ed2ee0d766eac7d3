//! Pose interpolation

use crate::model::{Pose, Transform};

/// Head and hands at a song time, between two recorded poses
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub time: f32,
    /// Index of the pose at or before `time`
    pub index: usize,
    /// Position between `index` and the next pose, in `[0, 1]`
    pub fraction: f32,
    pub head: Transform,
    pub left_hand: Transform,
    pub right_hand: Transform,
}

/// Advance `cursor` while the next pose starts at or before `time`
pub fn advance_cursor(poses: &[Pose], cursor: &mut usize, time: f32) {
    while poses.get(*cursor + 1).is_some_and(|next| next.time <= time) {
        *cursor += 1;
    }
}

/// Interpolate between the pose at `cursor` and the next one
///
/// A time exactly on a recorded pose returns that pose unchanged.
pub fn sample(poses: &[Pose], cursor: usize, time: f32) -> Option<PoseSample> {
    let current = poses.get(cursor)?;
    let fraction = match poses.get(cursor + 1) {
        Some(next) if next.time > current.time => {
            ((time - current.time) / (next.time - current.time)).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };

    let (head, left_hand, right_hand) = match poses.get(cursor + 1) {
        Some(next) if fraction > 0.0 => (
            current.head.lerp(&next.head, fraction),
            current.left_hand.lerp(&next.left_hand, fraction),
            current.right_hand.lerp(&next.right_hand, fraction),
        ),
        _ => (current.head, current.left_hand, current.right_hand),
    };

    Some(PoseSample {
        time,
        index: cursor,
        fraction,
        head,
        left_hand,
        right_hand,
    })
}
