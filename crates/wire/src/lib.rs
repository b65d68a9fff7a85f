//! Kinesync Wire Protocol Types
//!
//! This crate defines the shared Protobuf message types used between Game
//! Client and Game Server, and their conversions to and from simulation types.
//! Both binaries MUST depend on this crate so the schema has one definition.
//!
//! # Message Categories
//!
//! - **Reliable channel**: `PlayerName` (client → server), `SpawnPlayer`
//!   (server → client)
//! - **Unreliable channel**: `PlayerInput` (client → server), `PlayerMovement`
//!   (server → client, broadcast)
//!
//! Fields are tagged in the order the values are sent. 16-bit values travel as
//! `uint32` and are range-checked on decode; vectors and quaternions travel as
//! packed `float` arrays.

#![deny(unsafe_code)]

use kinesync_sim::{
    AuthoritativeSnapshot, InputBatch, InputSample, Intents, MAX_BATCH_TICKS, MovementUpdate,
    PlayerSpawn, Quat, Vec3,
};
use prost::Message;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failure to turn received bytes into simulation types.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("{field} must have exactly {expected} elements, got {actual}")]
    VectorLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} value {value} does not fit in 16 bits")]
    OutOfRange { field: &'static str, value: u32 },

    #[error("declared tick count {declared} does not match {actual} samples")]
    TickCountMismatch { declared: u32, actual: usize },

    #[error("input batch of {0} samples exceeds the one-byte tick count")]
    BatchTooLarge(usize),

    #[error("message envelope carried no body")]
    EmptyEnvelope,
}

// ============================================================================
// Channels
// ============================================================================

/// Delivery guarantee a message is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Reliable,
    Unreliable,
}

// ============================================================================
// Client → Server Messages
// ============================================================================

/// One buffered input sample.
#[derive(Clone, PartialEq, Message)]
pub struct InputSampleProto {
    /// `[forward, back, left, right, jump]`.
    #[prost(bool, repeated, tag = "1")]
    pub intents: Vec<bool>,

    #[prost(uint32, tag = "2")]
    pub tick: u32,

    /// Look rotation quaternion `[x, y, z, w]`.
    #[prost(float, repeated, tag = "3")]
    pub look_rotation: Vec<f32>,
}

/// Redundant batch of every un-acknowledged input sample.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerInputProto {
    /// Number of ticks covered (one byte of information).
    #[prost(uint32, tag = "1")]
    pub tick_count: u32,

    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<InputSampleProto>,
}

/// Username announcement that triggers a spawn.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerNameProto {
    #[prost(string, tag = "1")]
    pub username: String,
}

/// Client → server envelope.
#[derive(Clone, PartialEq, Message)]
pub struct ClientMessage {
    #[prost(oneof = "client_message::Body", tags = "1, 2")]
    pub body: Option<client_message::Body>,
}

pub mod client_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        PlayerName(super::PlayerNameProto),
        #[prost(message, tag = "2")]
        PlayerInput(super::PlayerInputProto),
    }
}

// ============================================================================
// Server → Client Messages
// ============================================================================

/// Authoritative state of one player after a replayed tick.
#[derive(Clone, PartialEq, Message)]
pub struct PlayerMovementProto {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,

    /// Tick the client will have predicted after applying the replayed input.
    #[prost(uint32, tag = "2")]
    pub tick: u32,

    #[prost(float, repeated, tag = "3")]
    pub position: Vec<f32>,

    #[prost(float, repeated, tag = "4")]
    pub forward: Vec<f32>,

    #[prost(float, repeated, tag = "5")]
    pub linear_velocity: Vec<f32>,

    #[prost(float, repeated, tag = "6")]
    pub angular_velocity: Vec<f32>,

    #[prost(float, repeated, tag = "7")]
    pub rotation: Vec<f32>,
}

/// Spawn announcement for one player.
#[derive(Clone, PartialEq, Message)]
pub struct SpawnPlayerProto {
    #[prost(uint32, tag = "1")]
    pub player_id: u32,

    #[prost(string, tag = "2")]
    pub username: String,

    #[prost(float, repeated, tag = "3")]
    pub position: Vec<f32>,
}

/// Server → client envelope.
#[derive(Clone, PartialEq, Message)]
pub struct ServerMessage {
    #[prost(oneof = "server_message::Body", tags = "1, 2")]
    pub body: Option<server_message::Body>,
}

pub mod server_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Body {
        #[prost(message, tag = "1")]
        SpawnPlayer(super::SpawnPlayerProto),
        #[prost(message, tag = "2")]
        PlayerMovement(super::PlayerMovementProto),
    }
}

// ============================================================================
// Decoded Packets
// ============================================================================

/// A decoded client → server message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    PlayerName(String),
    PlayerInput(InputBatch),
}

impl ClientPacket {
    pub fn channel(&self) -> Channel {
        match self {
            Self::PlayerName(_) => Channel::Reliable,
            Self::PlayerInput(_) => Channel::Unreliable,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Self::PlayerName(username) => client_message::Body::PlayerName(PlayerNameProto {
                username: username.clone(),
            }),
            Self::PlayerInput(batch) => client_message::Body::PlayerInput(batch.into()),
        };
        ClientMessage { body: Some(body) }.encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        match ClientMessage::decode(bytes)?.body {
            Some(client_message::Body::PlayerName(name)) => Ok(Self::PlayerName(name.username)),
            Some(client_message::Body::PlayerInput(input)) => {
                Ok(Self::PlayerInput(input.try_into()?))
            }
            None => Err(WireError::EmptyEnvelope),
        }
    }
}

/// A decoded server → client message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    SpawnPlayer(PlayerSpawn),
    PlayerMovement(MovementUpdate),
}

impl ServerPacket {
    pub fn channel(&self) -> Channel {
        match self {
            Self::SpawnPlayer(_) => Channel::Reliable,
            Self::PlayerMovement(_) => Channel::Unreliable,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Self::SpawnPlayer(spawn) => server_message::Body::SpawnPlayer(spawn.into()),
            Self::PlayerMovement(update) => server_message::Body::PlayerMovement(update.into()),
        };
        ServerMessage { body: Some(body) }.encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        match ServerMessage::decode(bytes)?.body {
            Some(server_message::Body::SpawnPlayer(spawn)) => {
                Ok(Self::SpawnPlayer(spawn.try_into()?))
            }
            Some(server_message::Body::PlayerMovement(movement)) => {
                Ok(Self::PlayerMovement(movement.try_into()?))
            }
            None => Err(WireError::EmptyEnvelope),
        }
    }
}

// ============================================================================
// Conversion Helpers
// ============================================================================

fn vec3_to_wire(v: Vec3) -> Vec<f32> {
    v.to_array().to_vec()
}

fn quat_to_wire(q: Quat) -> Vec<f32> {
    q.to_array().to_vec()
}

fn vec3_from_wire(field: &'static str, values: &[f32]) -> Result<Vec3, WireError> {
    match values {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(WireError::VectorLength {
            field,
            expected: 3,
            actual: values.len(),
        }),
    }
}

fn quat_from_wire(field: &'static str, values: &[f32]) -> Result<Quat, WireError> {
    match values {
        [x, y, z, w] => Ok(Quat::from_xyzw(*x, *y, *z, *w)),
        _ => Err(WireError::VectorLength {
            field,
            expected: 4,
            actual: values.len(),
        }),
    }
}

fn u16_from_wire(field: &'static str, value: u32) -> Result<u16, WireError> {
    u16::try_from(value).map_err(|_| WireError::OutOfRange { field, value })
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<&InputSample> for InputSampleProto {
    fn from(sample: &InputSample) -> Self {
        Self {
            intents: sample.intents.to_array().to_vec(),
            tick: u32::from(sample.tick),
            look_rotation: quat_to_wire(sample.look_rotation),
        }
    }
}

impl TryFrom<InputSampleProto> for InputSample {
    type Error = WireError;

    fn try_from(proto: InputSampleProto) -> Result<Self, Self::Error> {
        let flags: [bool; 5] =
            proto
                .intents
                .as_slice()
                .try_into()
                .map_err(|_| WireError::VectorLength {
                    field: "intents",
                    expected: 5,
                    actual: proto.intents.len(),
                })?;
        Ok(Self {
            tick: u16_from_wire("tick", proto.tick)?,
            intents: Intents::from_array(flags),
            look_rotation: quat_from_wire("look_rotation", &proto.look_rotation)?,
        })
    }
}

impl From<&InputBatch> for PlayerInputProto {
    fn from(batch: &InputBatch) -> Self {
        Self {
            tick_count: u32::from(batch.tick_count()),
            samples: batch.samples.iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<PlayerInputProto> for InputBatch {
    type Error = WireError;

    fn try_from(proto: PlayerInputProto) -> Result<Self, Self::Error> {
        if proto.samples.len() > MAX_BATCH_TICKS {
            return Err(WireError::BatchTooLarge(proto.samples.len()));
        }
        if proto.tick_count as usize != proto.samples.len() {
            return Err(WireError::TickCountMismatch {
                declared: proto.tick_count,
                actual: proto.samples.len(),
            });
        }
        let samples: Result<Vec<_>, _> = proto.samples.into_iter().map(TryInto::try_into).collect();
        Ok(Self::new(samples?))
    }
}

impl From<&MovementUpdate> for PlayerMovementProto {
    fn from(update: &MovementUpdate) -> Self {
        let snapshot = &update.snapshot;
        Self {
            player_id: u32::from(update.player_id),
            tick: u32::from(snapshot.tick),
            position: vec3_to_wire(snapshot.position),
            forward: vec3_to_wire(snapshot.forward()),
            linear_velocity: vec3_to_wire(snapshot.linear_velocity),
            angular_velocity: vec3_to_wire(snapshot.angular_velocity),
            rotation: quat_to_wire(snapshot.rotation),
        }
    }
}

impl TryFrom<PlayerMovementProto> for MovementUpdate {
    type Error = WireError;

    fn try_from(proto: PlayerMovementProto) -> Result<Self, Self::Error> {
        // Forward is derivable from rotation; only its shape is checked.
        vec3_from_wire("forward", &proto.forward)?;
        Ok(Self {
            player_id: u16_from_wire("player_id", proto.player_id)?,
            snapshot: AuthoritativeSnapshot {
                tick: u16_from_wire("tick", proto.tick)?,
                position: vec3_from_wire("position", &proto.position)?,
                rotation: quat_from_wire("rotation", &proto.rotation)?,
                linear_velocity: vec3_from_wire("linear_velocity", &proto.linear_velocity)?,
                angular_velocity: vec3_from_wire("angular_velocity", &proto.angular_velocity)?,
            },
        })
    }
}

impl From<&PlayerSpawn> for SpawnPlayerProto {
    fn from(spawn: &PlayerSpawn) -> Self {
        Self {
            player_id: u32::from(spawn.player_id),
            username: spawn.username.clone(),
            position: vec3_to_wire(spawn.position),
        }
    }
}

impl TryFrom<SpawnPlayerProto> for PlayerSpawn {
    type Error = WireError;

    fn try_from(proto: SpawnPlayerProto) -> Result<Self, Self::Error> {
        Ok(Self {
            player_id: u16_from_wire("player_id", proto.player_id)?,
            username: proto.username,
            position: vec3_from_wire("position", &proto.position)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
