//! Deterministic reference implementation of [`PhysicsWorld`].
//!
//! Explicit Euler on spherical bodies over static axis-aligned ground volumes.
//! It is not a general rigid-body engine: bodies do not collide with each
//! other, and ground contact only stops downward motion. What it guarantees is
//! that an identical call sequence produces identical bits, which is all
//! prediction and replay need.

use glam::{Quat, Vec3};

use crate::physics::{BodyHandle, ForceMode, LayerMask, PhysicsWorld};

/// Standard gravity used by [`ReferenceWorld::default`].
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Parameters for a new body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec3,
    pub rotation: Quat,
    pub mass: f32,
    /// Collision radius against ground volumes.
    pub radius: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            mass: 1.0,
            radius: 0.5,
        }
    }
}

/// Static box collider tagged with a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundVolume {
    pub min: Vec3,
    pub max: Vec3,
    pub layer: LayerMask,
}

impl GroundVolume {
    /// Flat slab whose top face sits at `height`, spanning `half_extent`
    /// around the origin on x and z.
    pub fn slab(height: f32, half_extent: f32, layer: LayerMask) -> Self {
        Self {
            min: Vec3::new(-half_extent, height - 1.0, -half_extent),
            max: Vec3::new(half_extent, height, half_extent),
            layer,
        }
    }

    fn overlaps_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    fn covers_footprint(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.z >= self.min.z && point.z <= self.max.z
    }
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec3,
    rotation: Quat,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    inverse_mass: f32,
    radius: f32,
    kinematic: bool,
    force: Vec3,
    acceleration: Vec3,
}

impl Body {
    fn new(desc: &BodyDesc) -> Self {
        assert!(desc.mass > 0.0, "body mass must be positive");

        Self {
            position: desc.position,
            rotation: desc.rotation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inverse_mass: 1.0 / desc.mass,
            radius: desc.radius,
            kinematic: false,
            force: Vec3::ZERO,
            acceleration: Vec3::ZERO,
        }
    }
}

/// A small deterministic physics world.
#[derive(Debug, Clone)]
pub struct ReferenceWorld {
    gravity: Vec3,
    bodies: Vec<Option<Body>>,
    ground: Vec<GroundVolume>,
}

impl Default for ReferenceWorld {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl ReferenceWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            ground: Vec::new(),
        }
    }

    pub fn add_ground(&mut self, volume: GroundVolume) {
        self.ground.push(volume);
    }

    /// Create a body. Handles are never reused within one world.
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Some(Body::new(&desc)));
        handle
    }

    /// Destroy a body. Returns false if it was already gone.
    pub fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.bodies
            .get_mut(body.0 as usize)
            .and_then(Option::take)
            .is_some()
    }

    pub fn contains(&self, body: BodyHandle) -> bool {
        matches!(self.bodies.get(body.0 as usize), Some(Some(_)))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    fn body(&self, handle: BodyHandle) -> &Body {
        match self.bodies.get(handle.0 as usize) {
            Some(Some(body)) => body,
            _ => panic!("unknown body handle {handle:?}"),
        }
    }

    fn body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        match self.bodies.get_mut(handle.0 as usize) {
            Some(Some(body)) => body,
            _ => panic!("unknown body handle {handle:?}"),
        }
    }

    fn resolve_ground(ground: &[GroundVolume], body: &mut Body) {
        for volume in ground {
            if !volume.covers_footprint(body.position) {
                continue;
            }
            let bottom = body.position.y - body.radius;
            if bottom < volume.max.y && body.position.y >= volume.min.y {
                body.position.y = volume.max.y + body.radius;
                if body.linear_velocity.y < 0.0 {
                    body.linear_velocity.y = 0.0;
                }
            }
        }
    }
}

impl PhysicsWorld for ReferenceWorld {
    fn add_force(&mut self, body: BodyHandle, force: Vec3, mode: ForceMode) {
        let body = self.body_mut(body);
        if body.kinematic {
            return;
        }
        match mode {
            ForceMode::Force => body.force += force,
            ForceMode::Acceleration => body.acceleration += force,
            ForceMode::Impulse => body.linear_velocity += force * body.inverse_mass,
            ForceMode::VelocityChange => body.linear_velocity += force,
        }
    }

    fn simulate(&mut self, dt: f32) {
        let gravity = self.gravity;
        for body in self.bodies.iter_mut().flatten() {
            if !body.kinematic {
                let acceleration = gravity + body.force * body.inverse_mass + body.acceleration;
                body.linear_velocity += acceleration * dt;
                body.position += body.linear_velocity * dt;

                if body.angular_velocity != Vec3::ZERO {
                    let spin = Quat::from_scaled_axis(body.angular_velocity * dt);
                    body.rotation = (spin * body.rotation).normalize();
                }

                Self::resolve_ground(&self.ground, body);
            }

            body.force = Vec3::ZERO;
            body.acceleration = Vec3::ZERO;
        }
    }

    fn check_sphere(&self, center: Vec3, radius: f32, layers: LayerMask) -> bool {
        self.ground
            .iter()
            .filter(|volume| volume.layer.intersects(layers))
            .any(|volume| volume.overlaps_sphere(center, radius))
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn position(&self, body: BodyHandle) -> Vec3 {
        self.body(body).position
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec3) {
        self.body_mut(body).position = position;
    }

    fn rotation(&self, body: BodyHandle) -> Quat {
        self.body(body).rotation
    }

    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        self.body_mut(body).rotation = rotation;
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).linear_velocity
    }

    fn set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        self.body_mut(body).linear_velocity = velocity;
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).angular_velocity
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        self.body_mut(body).angular_velocity = velocity;
    }

    /// Making a body kinematic drops its velocities, like most engines do.
    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        let body = self.body_mut(body);
        if kinematic && !body.kinematic {
            body.linear_velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
        body.kinematic = kinematic;
    }

    fn is_kinematic(&self, body: BodyHandle) -> bool {
        self.body(body).kinematic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_floor() -> ReferenceWorld {
        let mut world = ReferenceWorld::default();
        world.add_ground(GroundVolume::slab(0.0, 50.0, LayerMask::layer(0)));
        world
    }

    #[test]
    fn test_body_falls_and_rests_on_ground() {
        let mut world = world_with_floor();
        let body = world.add_body(BodyDesc::default());

        for _ in 0..200 {
            world.simulate(0.02);
        }

        assert_eq!(world.position(body).y, 0.5);
        assert_eq!(world.linear_velocity(body).y, 0.0);
    }

    #[test]
    fn test_force_modes() {
        let mut world = ReferenceWorld::new(Vec3::ZERO);
        let body = world.add_body(BodyDesc {
            mass: 2.0,
            ..Default::default()
        });

        world.add_force(body, Vec3::new(4.0, 0.0, 0.0), ForceMode::Impulse);
        assert_eq!(world.linear_velocity(body), Vec3::new(2.0, 0.0, 0.0));

        world.add_force(body, Vec3::new(0.0, 0.0, 1.0), ForceMode::VelocityChange);
        assert_eq!(world.linear_velocity(body), Vec3::new(2.0, 0.0, 1.0));

        world.set_linear_velocity(body, Vec3::ZERO);
        world.add_force(body, Vec3::new(10.0, 0.0, 0.0), ForceMode::Force);
        world.add_force(body, Vec3::new(0.0, 0.0, 10.0), ForceMode::Acceleration);
        world.simulate(0.5);
        assert_eq!(world.linear_velocity(body), Vec3::new(2.5, 0.0, 5.0));
    }

    #[test]
    fn test_kinematic_body_is_not_integrated() {
        let mut world = ReferenceWorld::default();
        let body = world.add_body(BodyDesc::default());
        world.set_linear_velocity(body, Vec3::new(1.0, 0.0, 0.0));

        world.set_kinematic(body, true);
        let before = world.position(body);
        world.add_force(body, Vec3::splat(100.0), ForceMode::Force);
        world.simulate(0.02);

        assert_eq!(world.position(body), before);
        assert_eq!(world.linear_velocity(body), Vec3::ZERO);
        assert!(world.is_kinematic(body));
    }

    #[test]
    fn test_check_sphere_respects_layers() {
        let world = world_with_floor();
        let touching = Vec3::new(0.0, 0.1, 0.0);

        assert!(world.check_sphere(touching, 0.2, LayerMask::layer(0)));
        assert!(!world.check_sphere(touching, 0.2, LayerMask::layer(1)));
        assert!(!world.check_sphere(Vec3::new(0.0, 1.0, 0.0), 0.2, LayerMask::ALL));
    }

    #[test]
    fn test_angular_velocity_rotates_body() {
        let mut world = ReferenceWorld::new(Vec3::ZERO);
        let body = world.add_body(BodyDesc::default());
        world.set_angular_velocity(body, Vec3::new(0.0, std::f32::consts::PI, 0.0));

        world.simulate(0.5);

        let forward = world.rotation(body) * Vec3::Z;
        assert!((forward - Vec3::X).length() < 1e-5, "forward was {forward:?}");
    }

    #[test]
    fn test_remove_body() {
        let mut world = ReferenceWorld::default();
        let a = world.add_body(BodyDesc::default());
        let b = world.add_body(BodyDesc::default());

        assert!(world.remove_body(a));
        assert!(!world.remove_body(a));
        assert!(!world.contains(a));
        assert!(world.contains(b));
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown body handle")]
    fn test_removed_handle_panics() {
        let mut world = ReferenceWorld::default();
        let a = world.add_body(BodyDesc::default());
        world.remove_body(a);
        world.position(a);
    }
}
