//! Physics capability contract.
//!
//! The core never owns a rigid-body engine. Client and server hand it one
//! through [`PhysicsWorld`], which exposes exactly what the Movement Policy and
//! the rewind/replay paths need: force application, one fixed integration
//! step, a sphere overlap query, and direct access to body state.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Opaque reference to a body inside a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// How a vector passed to [`PhysicsWorld::add_force`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force, divided by mass, applied over the next step.
    Force,
    /// Continuous acceleration applied over the next step, mass-independent.
    Acceleration,
    /// Instant change in momentum, divided by mass.
    Impulse,
    /// Instant change in velocity, mass-independent.
    VelocityChange,
}

/// Bit set of collision layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing only layer `index` (0..32).
    pub const fn layer(index: u8) -> Self {
        Self(1u32 << (index as u32 & 31))
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// The injected physics capability set.
///
/// `simulate` advances every non-kinematic body in the world by one step;
/// that shared effect is why the server freezes other players before an
/// out-of-band replay.
///
/// Implementations must be deterministic for identical call sequences if
/// bit-for-bit reconciliation is expected.
pub trait PhysicsWorld {
    fn add_force(&mut self, body: BodyHandle, force: Vec3, mode: ForceMode);

    /// Integrate the whole world by `dt` seconds.
    fn simulate(&mut self, dt: f32);

    /// True if a sphere at `center` overlaps any collider on `layers`.
    fn check_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> bool;

    fn gravity(&self) -> Vec3;

    fn position(&self, body: BodyHandle) -> Vec3;
    fn set_position(&mut self, body: BodyHandle, position: Vec3);

    fn rotation(&self, body: BodyHandle) -> Quat;
    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat);

    fn linear_velocity(&self, body: BodyHandle) -> Vec3;
    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    fn angular_velocity(&self, body: BodyHandle) -> Vec3;
    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3);

    /// Exclude (`true`) or re-include (`false`) a body from integration.
    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool);
    fn is_kinematic(&self, body: BodyHandle) -> bool;
}
