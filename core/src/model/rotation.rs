//! Average head rotation
//!
//! Recorded head rotations carry a systematic forward-facing bias. The
//! average rotation over the whole play is inverted into a correction that
//! re-levels any recorded orientation. Every format uses this same
//! averaging.

use glam::{EulerRot, Quat, Vec4};

/// Running quaternion average
///
/// `q` and `-q` describe the same rotation. Each sample is flipped onto the
/// hemisphere of the running mean before accumulating so that double-cover
/// pairs reinforce instead of cancelling. The mean follows a player turning
/// all the way around on a 360 degree map.
#[derive(Debug, Clone, Copy)]
pub struct RotationAverager {
    first: Option<Vec4>,
    sum: Vec4,
    count: u32,
    yaw_only: bool,
}

impl RotationAverager {
    /// Create an averager; `yaw_only` keeps only the rotation about Y
    pub fn new(yaw_only: bool) -> Self {
        Self {
            first: None,
            sum: Vec4::ZERO,
            count: 0,
            yaw_only,
        }
    }

    pub fn add(&mut self, rotation: Quat) {
        let rotation = if self.yaw_only {
            yaw_of(rotation)
        } else {
            rotation
        };
        let mut sample = Vec4::from(rotation.normalize());
        let first = *self.first.get_or_insert(sample);
        // A cancelled-out sum has no direction; fall back to the first sample
        let reference = if self.sum.length_squared() > f32::EPSILON {
            self.sum
        } else {
            first
        };
        if sample.dot(reference) < 0.0 {
            sample = -sample;
        }
        self.sum += sample;
        self.count += 1;
    }

    /// Number of samples seen
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Average of all samples, identity when empty
    pub fn average(&self) -> Quat {
        if self.count == 0 {
            return Quat::IDENTITY;
        }
        let mean = self.sum / self.count as f32;
        if mean.length_squared() < f32::EPSILON {
            return Quat::IDENTITY;
        }
        Quat::from_vec4(mean.normalize())
    }

    /// Inverse of the average, used as a bias correction
    pub fn offset(&self) -> Quat {
        self.average().inverse()
    }
}

/// Bias-correction quaternion for a sequence of head rotations
pub fn average_rotation_offset(rotations: impl IntoIterator<Item = Quat>, yaw_only: bool) -> Quat {
    let mut averager = RotationAverager::new(yaw_only);
    for rotation in rotations {
        averager.add(rotation);
    }
    averager.offset()
}

fn yaw_of(rotation: Quat) -> Quat {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_rotation_y(yaw)
}
