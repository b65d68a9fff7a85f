//! The Movement Policy shared by client prediction and server replay.
//!
//! One call maps (intents, look rotation, current physics state) to the forces
//! for a single fixed tick. It holds no state between calls; given the same
//! world state and sample it issues the same forces.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::{BodyHandle, ForceMode, LayerMask, PhysicsWorld};
use crate::{InputSample, Intents};

// ============================================================================
// Configuration
// ============================================================================

/// Tuning consumed by [`MovementPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Horizontal drive force magnitude.
    pub move_force: f32,
    /// Horizontal speed the damping term settles at (for unit mass).
    pub max_move_speed: f32,
    /// Vertical impulse applied on a grounded jump.
    pub jump_force: f32,
    /// Extra gravity, as a multiple of the world's vertical gravity.
    pub gravity_scale: f32,
    /// Ground probe center, relative to the body position.
    pub ground_check_offset: Vec3,
    pub ground_check_radius: f32,
    pub ground_layer: LayerMask,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_force: 40.0,
            max_move_speed: 8.0,
            jump_force: 6.0,
            gravity_scale: 1.0,
            ground_check_offset: Vec3::new(0.0, -0.5, 0.0),
            ground_check_radius: 0.2,
            ground_layer: LayerMask::layer(0),
        }
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Stateless step function applying one tick of movement forces.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementPolicy {
    config: MovementConfig,
}

impl MovementPolicy {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Ground probe against the configured layer.
    pub fn is_grounded<W: PhysicsWorld + ?Sized>(&self, world: &W, body: BodyHandle) -> bool {
        let center = world.position(body) + self.config.ground_check_offset;
        world.check_sphere(center, self.config.ground_check_radius, self.config.ground_layer)
    }

    /// Apply one tick of forces to `body`. Returns the ground probe result.
    ///
    /// Must be followed by exactly one fixed-duration integration step.
    pub fn step<W: PhysicsWorld + ?Sized>(
        &self,
        world: &mut W,
        body: BodyHandle,
        intents: Intents,
        look_rotation: Quat,
    ) -> bool {
        let config = &self.config;
        let grounded = self.is_grounded(world, body);
        let direction = intents.move_vector();

        if intents.contains(Intents::JUMP) && grounded {
            world.add_force(body, Vec3::new(0.0, config.jump_force, 0.0), ForceMode::Impulse);
        }

        world.add_force(
            body,
            (look_rotation * Vec3::X) * direction.x * config.move_force,
            ForceMode::Force,
        );
        world.add_force(
            body,
            (look_rotation * Vec3::Z) * direction.y * config.move_force,
            ForceMode::Force,
        );

        // Damping toward zero horizontal velocity bounds terminal speed.
        let velocity = world.linear_velocity(body);
        let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
        world.add_force(
            body,
            -horizontal * (config.move_force / config.max_move_speed),
            ForceMode::Acceleration,
        );

        world.add_force(
            body,
            Vec3::Y * world.gravity().y * config.gravity_scale,
            ForceMode::Acceleration,
        );

        grounded
    }

    /// Policy step for `sample` followed by one integration of `dt` seconds.
    pub fn simulate_tick<W: PhysicsWorld + ?Sized>(
        &self,
        world: &mut W,
        body: BodyHandle,
        sample: &InputSample,
        dt: f32,
    ) -> bool {
        let grounded = self.step(world, body, sample.intents, sample.look_rotation);
        world.simulate(dt);
        grounded
    }
}

impl Default for MovementPolicy {
    fn default() -> Self {
        Self::new(MovementConfig::default())
    }
}

// ============================================================================
// Tests
// ============================================================================
