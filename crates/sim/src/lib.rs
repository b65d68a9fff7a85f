//! Kinesync Simulation Core
//!
//! This crate contains the tick-indexed pieces shared by the predicting client
//! and the authoritative server: input samples, per-tick state records, the
//! history ring buffer, the Movement Policy, and the physics contract both
//! sides drive it through.
//!
//! # Architecture Constraints
//!
//! The Simulation Core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Read wall-clock time
//! - Use ambient/unseeded randomness
//! - Own a concrete physics engine (it only talks to [`PhysicsWorld`])
//!
//! All external communication occurs through the wire crate; the client and
//! server crates own the timing of every call into this one.

#![deny(unsafe_code)]

pub mod config;
pub mod history;
pub mod movement;
pub mod physics;
pub mod reference;

pub use config::{ConfigError, SimConfig};
pub use glam::{Quat, Vec2, Vec3};
pub use history::TickHistory;
pub use movement::{MovementConfig, MovementPolicy};
pub use physics::{BodyHandle, ForceMode, LayerMask, PhysicsWorld};
pub use reference::{BodyDesc, GroundVolume, ReferenceWorld};

use std::ops::BitOr;

// ============================================================================
// Type Aliases
// ============================================================================

/// A single discrete simulation timestep. Wraps at 65536.
pub type Tick = u16;

/// Connection-scoped player identifier assigned by the transport.
pub type PlayerId = u16;

/// Default number of ticks kept by every history buffer.
///
/// Must stay a power of two so `tick mod capacity` is stable across the
/// 16-bit wrap.
pub const HISTORY_CAPACITY: usize = 1024;

/// Largest number of samples one input batch can describe (one-byte count).
pub const MAX_BATCH_TICKS: usize = u8::MAX as usize;

// ============================================================================
// Tick Arithmetic
// ============================================================================

/// Returns true if `a` is strictly newer than `b` under 16-bit wraparound.
pub fn tick_is_newer(a: Tick, b: Tick) -> bool {
    (a.wrapping_sub(b) as i16) > 0
}

/// Number of ticks from `from` up to (not including) `to`.
pub fn tick_span(from: Tick, to: Tick) -> u16 {
    to.wrapping_sub(from)
}

// ============================================================================
// Intents
// ============================================================================

/// The five movement intents a player can hold during one tick.
///
/// Stored as bit-flags; the wire form is a fixed `[forward, back, left, right,
/// jump]` boolean array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Intents(u8);

impl Intents {
    pub const FORWARD: Self = Self(1 << 0);
    pub const BACK: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);
    pub const JUMP: Self = Self(1 << 4);

    const ALL_BITS: u8 = 0b1_1111;

    /// No intents held.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits, discarding anything outside the five flags.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL_BITS)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Wire order: forward, back, left, right, jump.
    pub fn from_array(flags: [bool; 5]) -> Self {
        let order = [
            Self::FORWARD,
            Self::BACK,
            Self::LEFT,
            Self::RIGHT,
            Self::JUMP,
        ];
        order
            .into_iter()
            .zip(flags)
            .filter(|(_, held)| *held)
            .fold(Self::empty(), |acc, (flag, _)| acc | flag)
    }

    /// Wire order: forward, back, left, right, jump.
    pub fn to_array(self) -> [bool; 5] {
        [
            self.contains(Self::FORWARD),
            self.contains(Self::BACK),
            self.contains(Self::LEFT),
            self.contains(Self::RIGHT),
            self.contains(Self::JUMP),
        ]
    }

    /// 2D move vector: x is strafe (left -1, right +1), y is forward/back.
    ///
    /// Opposing intents cancel additively.
    pub fn move_vector(self) -> Vec2 {
        let mut direction = Vec2::ZERO;
        if self.contains(Self::FORWARD) {
            direction.y += 1.0;
        }
        if self.contains(Self::BACK) {
            direction.y -= 1.0;
        }
        if self.contains(Self::LEFT) {
            direction.x -= 1.0;
        }
        if self.contains(Self::RIGHT) {
            direction.x += 1.0;
        }
        direction
    }
}

impl BitOr for Intents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// One tick of captured input. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub tick: Tick,
    pub intents: Intents,
    pub look_rotation: Quat,
}

impl InputSample {
    pub fn new(tick: Tick, intents: Intents, look_rotation: Quat) -> Self {
        Self {
            tick,
            intents,
            look_rotation,
        }
    }

    /// A sample with nothing held, used where a history slot was never filled.
    pub fn idle(tick: Tick) -> Self {
        Self::new(tick, Intents::empty(), Quat::IDENTITY)
    }
}

/// Client-local pre-step state for a tick, kept only for divergence checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedState {
    pub tick: Tick,
    pub position: Vec3,
    pub rotation: Quat,
}

impl PredictedState {
    /// Read the current pose of `body` and tag it with `tick`.
    pub fn capture<W: PhysicsWorld + ?Sized>(world: &W, body: BodyHandle, tick: Tick) -> Self {
        Self {
            tick,
            position: world.position(body),
            rotation: world.rotation(body),
        }
    }
}

/// The server's declared true state of one body at a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthoritativeSnapshot {
    pub tick: Tick,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl AuthoritativeSnapshot {
    /// Read the full dynamic state of `body` and tag it with `tick`.
    pub fn capture<W: PhysicsWorld + ?Sized>(world: &W, body: BodyHandle, tick: Tick) -> Self {
        Self {
            tick,
            position: world.position(body),
            rotation: world.rotation(body),
            linear_velocity: world.linear_velocity(body),
            angular_velocity: world.angular_velocity(body),
        }
    }

    /// Hard-set `body` to this state.
    pub fn apply_to<W: PhysicsWorld + ?Sized>(&self, world: &mut W, body: BodyHandle) {
        world.set_position(body, self.position);
        world.set_rotation(body, self.rotation);
        world.set_linear_velocity(body, self.linear_velocity);
        world.set_angular_velocity(body, self.angular_velocity);
    }

    /// The body's forward axis (+Z rotated by `rotation`).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// FNV-1a 64 digest over the canonicalized state, tick first.
    pub fn digest(&self) -> u64 {
        let mut hasher = Fnv1a64::new();
        hasher.update(&self.tick.to_le_bytes());
        for value in self
            .position
            .to_array()
            .into_iter()
            .chain(self.rotation.to_array())
            .chain(self.linear_velocity.to_array())
            .chain(self.angular_velocity.to_array())
        {
            hasher.update(&canonicalize_f32(value).to_le_bytes());
        }
        hasher.finish()
    }
}

/// Authoritative movement of one player as broadcast by the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementUpdate {
    pub player_id: PlayerId,
    pub snapshot: AuthoritativeSnapshot,
}

/// A newly spawned player as announced by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSpawn {
    pub player_id: PlayerId,
    pub username: String,
    pub position: Vec3,
}

impl PlayerSpawn {
    /// Name shown for the player; empty usernames display as "Guest".
    pub fn display_name(&self) -> String {
        let name = if self.username.is_empty() {
            "Guest"
        } else {
            self.username.as_str()
        };
        format!("Player {} ({})", self.player_id, name)
    }
}

/// Render-only offset between where the body was drawn and where it is now.
///
/// Never feeds back into simulation state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorOffset {
    pub position: Vec3,
    pub rotation: Quat,
}

impl ErrorOffset {
    pub const ZERO: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl Default for ErrorOffset {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Contiguous run of input samples uploaded in one unreliable message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBatch {
    pub samples: Vec<InputSample>,
}

impl InputBatch {
    pub fn new(samples: Vec<InputSample>) -> Self {
        debug_assert!(samples.len() <= MAX_BATCH_TICKS, "batch exceeds one-byte count");
        Self { samples }
    }

    /// One-byte count of ticks covered.
    pub fn tick_count(&self) -> u8 {
        self.samples.len().min(MAX_BATCH_TICKS) as u8
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn first_tick(&self) -> Option<Tick> {
        self.samples.first().map(|s| s.tick)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.samples.last().map(|s| s.tick)
    }
}

// ============================================================================
// State Digest
// ============================================================================

/// FNV-1a 64-bit offset basis.
const FNV1A_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// FNV-1a 64-bit prime.
const FNV1A_PRIME: u64 = 0x100000001b3;

#[derive(Debug, Clone)]
struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self {
            state: FNV1A_OFFSET_BASIS,
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV1A_PRIME);
        }
    }

    fn finish(self) -> u64 {
        self.state
    }
}

/// Order-sensitive digest over many snapshots, e.g. every body in a world.
pub fn combined_digest<'a>(snapshots: impl IntoIterator<Item = &'a AuthoritativeSnapshot>) -> u64 {
    let mut hasher = Fnv1a64::new();
    for snapshot in snapshots {
        hasher.update(&snapshot.digest().to_le_bytes());
    }
    hasher.finish()
}

/// Canonicalize an f32 for hashing: `-0.0` → `+0.0`, any NaN → quiet NaN.
fn canonicalize_f32(value: f32) -> u32 {
    const QUIET_NAN_BITS: u32 = 0x7fc0_0000;

    if value.is_nan() {
        QUIET_NAN_BITS
    } else if value == 0.0 {
        0u32
    } else {
        value.to_bits()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_is_newer_handles_wrap() {
        assert!(tick_is_newer(5, 4));
        assert!(!tick_is_newer(4, 4));
        assert!(!tick_is_newer(3, 4));
        assert!(tick_is_newer(2, u16::MAX));
        assert!(!tick_is_newer(u16::MAX, 2));
    }

    #[test]
    fn test_tick_span_wraps() {
        assert_eq!(tick_span(100, 105), 5);
        assert_eq!(tick_span(65530, 4), 10);
        assert_eq!(tick_span(7, 7), 0);
    }

    #[test]
    fn test_opposing_intents_cancel() {
        let both = Intents::FORWARD | Intents::BACK;
        assert_eq!(both.move_vector(), Vec2::ZERO);

        let strafe = Intents::LEFT | Intents::RIGHT | Intents::FORWARD;
        assert_eq!(strafe.move_vector(), Vec2::new(0.0, 1.0));

        let diagonal = Intents::BACK | Intents::RIGHT;
        assert_eq!(diagonal.move_vector(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_intents_array_order() {
        let intents = Intents::from_array([true, false, false, true, true]);
        assert!(intents.contains(Intents::FORWARD));
        assert!(intents.contains(Intents::RIGHT));
        assert!(intents.contains(Intents::JUMP));
        assert!(!intents.contains(Intents::BACK));
        assert_eq!(intents.to_array(), [true, false, false, true, true]);
    }

    #[test]
    fn test_intents_truncate_unknown_bits() {
        assert_eq!(Intents::from_bits_truncate(0xff).bits(), 0b1_1111);
    }

    #[test]
    fn test_digest_canonicalizes_negative_zero() {
        let a = AuthoritativeSnapshot {
            tick: 3,
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        };
        let b = AuthoritativeSnapshot {
            position: Vec3::new(-0.0, 1.0, -0.0),
            ..a
        };
        assert_eq!(a.digest(), b.digest());

        let moved = AuthoritativeSnapshot {
            position: Vec3::new(0.5, 1.0, 0.0),
            ..a
        };
        assert_ne!(a.digest(), moved.digest());
    }

    #[test]
    fn test_f32_canonicalization() {
        assert_eq!(canonicalize_f32(-0.0), 0u32);
        assert_eq!(
            canonicalize_f32(f32::NAN),
            canonicalize_f32(f32::from_bits(0x7f80_0001))
        );
        assert_eq!(canonicalize_f32(1.0), 1.0f32.to_bits());
    }

    #[test]
    fn test_spawn_display_name_guest() {
        let spawn = PlayerSpawn {
            player_id: 4,
            username: String::new(),
            position: Vec3::new(0.0, 1.0, 0.0),
        };
        assert_eq!(spawn.display_name(), "Player 4 (Guest)");
    }

    #[test]
    fn test_batch_tick_bounds() {
        let batch = InputBatch::new(vec![InputSample::idle(50), InputSample::idle(51)]);
        assert_eq!(batch.tick_count(), 2);
        assert_eq!(batch.first_tick(), Some(50));
        assert_eq!(batch.last_tick(), Some(51));
        assert!(InputBatch::default().last_tick().is_none());
    }

    #[test]
    fn test_combined_digest_is_order_sensitive() {
        let at = |x: f32| AuthoritativeSnapshot {
            tick: 0,
            position: Vec3::new(x, 0.5, 0.0),
            rotation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        };
        let (a, b) = (at(1.0), at(2.0));
        assert_eq!(combined_digest([&a, &b]), combined_digest([&a, &b]));
        assert_ne!(combined_digest([&a, &b]), combined_digest([&b, &a]));
    }
}
