//! Default render-side consumer of the reconciliation error offset.
//!
//! The reconciler only decides what the offset is after a correction. Fading
//! it out belongs to whoever renders; this is an exponential fade that a
//! renderer can use as-is or replace.

use kinesync_sim::{ErrorOffset, Quat};

/// Offsets below these are dropped to exactly zero.
const POSITION_EPSILON_SQ: f32 = 1e-8;
const ROTATION_EPSILON: f32 = 1e-4;

/// Exponential decay of an [`ErrorOffset`] toward zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualSmoother {
    /// Seconds for the offset to halve.
    pub half_life: f32,
}

impl Default for VisualSmoother {
    fn default() -> Self {
        Self { half_life: 0.05 }
    }
}

impl VisualSmoother {
    pub fn new(half_life: f32) -> Self {
        Self { half_life }
    }

    /// Offset remaining after `frame_dt` seconds.
    pub fn decay(&self, offset: ErrorOffset, frame_dt: f32) -> ErrorOffset {
        if offset.is_zero() {
            return offset;
        }
        if self.half_life <= 0.0 {
            return ErrorOffset::ZERO;
        }

        let keep = 0.5f32.powf(frame_dt / self.half_life);
        let position = offset.position * keep;
        let rotation = Quat::IDENTITY.slerp(offset.rotation, keep);

        if position.length_squared() < POSITION_EPSILON_SQ
            && rotation.angle_between(Quat::IDENTITY) < ROTATION_EPSILON
        {
            ErrorOffset::ZERO
        } else {
            ErrorOffset { position, rotation }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinesync_sim::Vec3;

    #[test]
    fn test_one_half_life_halves_position() {
        let smoother = VisualSmoother::new(0.1);
        let offset = ErrorOffset {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
        };

        let decayed = smoother.decay(offset, 0.1);
        assert!((decayed.position.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decay_reaches_exact_zero() {
        let smoother = VisualSmoother::default();
        let mut offset = ErrorOffset {
            position: Vec3::new(0.8, -0.3, 0.1),
            rotation: Quat::from_rotation_y(0.2),
        };

        for _ in 0..200 {
            offset = smoother.decay(offset, 1.0 / 60.0);
        }
        assert!(offset.is_zero());
    }

    #[test]
    fn test_zero_half_life_clears_immediately() {
        let offset = ErrorOffset {
            position: Vec3::ONE,
            rotation: Quat::IDENTITY,
        };
        assert!(VisualSmoother::new(0.0).decay(offset, 0.016).is_zero());
    }
}
