//! Kinesync Server
//!
//! The server owns one authoritative body per connected player plus one
//! processed-input cursor per player. It owns:
//! - The player registry (`ServerSession`)
//! - Spawn announcements for joining players
//! - Batch admission and isolated replay of one player's missing ticks
//!
//! # Isolation
//!
//! A replay steps the shared physics world once per missing tick. Every
//! other player is frozen (made kinematic, velocities cached) for the
//! duration and restored afterwards, so only the triggering player's body
//! advances. The freeze is a flag, not a lock: callers must dispatch one
//! batch at a time.
//!
//! The session never creates or destroys bodies. The caller adds a body to
//! its world before `spawn_player` and removes the handle returned by
//! `disconnect`.

#![deny(unsafe_code)]

pub mod batch;
pub mod session;

use std::collections::BTreeMap;

use kinesync_sim::{
    AuthoritativeSnapshot, BodyHandle, InputBatch, MovementPolicy, MovementUpdate, PhysicsWorld,
    PlayerId, Quat, SimConfig, Tick, Vec3,
};
use kinesync_wire::{ClientPacket, ServerPacket};
use thiserror::Error;
use tracing::{debug, info, trace};

use batch::{Admission, admit};
use session::{SPAWN_POSITION, ServerPlayer};

// ============================================================================
// Errors
// ============================================================================

/// Registry errors. Batch policy outcomes are reported through
/// [`BatchOutcome`] instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is already registered")]
    DuplicatePlayer(PlayerId),
}

// ============================================================================
// Outbound Messages
// ============================================================================

/// Who an outbound packet goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    All,
    Only(PlayerId),
}

impl Recipients {
    pub fn includes(&self, player_id: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => *id == player_id,
        }
    }
}

/// A packet the caller must deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub recipients: Recipients,
    pub packet: ServerPacket,
}

impl Outbound {
    pub fn broadcast(packet: ServerPacket) -> Self {
        Self {
            recipients: Recipients::All,
            packet,
        }
    }

    pub fn to(player_id: PlayerId, packet: ServerPacket) -> Self {
        Self {
            recipients: Recipients::Only(player_id),
            packet,
        }
    }
}

// ============================================================================
// Batch Outcome
// ============================================================================

/// What processing one input batch did.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The batch had no samples.
    Empty,
    /// Everything in the batch was already simulated.
    Stale { last_tick: Tick, cursor: Tick },
    /// New ticks were simulated; one update per replayed tick, oldest first.
    Simulated {
        updates: Vec<MovementUpdate>,
        cursor: Tick,
    },
}

impl BatchOutcome {
    pub fn updates(&self) -> &[MovementUpdate] {
        match self {
            Self::Simulated { updates, .. } => updates,
            _ => &[],
        }
    }

    /// Broadcast packets for every update.
    pub fn into_outbound(self) -> Vec<Outbound> {
        match self {
            Self::Simulated { updates, .. } => updates
                .into_iter()
                .map(|update| Outbound::broadcast(ServerPacket::PlayerMovement(update)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Velocity state of a player held still during another player's replay.
struct Frozen {
    body: BodyHandle,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
}

// ============================================================================
// Server Session
// ============================================================================

/// Registry of connected players and the batch simulator over them.
pub struct ServerSession {
    players: BTreeMap<PlayerId, ServerPlayer>,
    policy: MovementPolicy,
    dt: f32,
}

impl ServerSession {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            players: BTreeMap::new(),
            policy: MovementPolicy::new(config.movement.clone()),
            dt: config.fixed_delta(),
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&ServerPlayer> {
        self.players.get(&player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &ServerPlayer> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn last_processed_input_tick(&self, player_id: PlayerId) -> Option<Tick> {
        self.players
            .get(&player_id)
            .and_then(|p| p.last_processed_input_tick)
    }

    /// Register `player_id` driving `body`, place the body at the spawn point
    /// and produce the spawn announcements.
    ///
    /// The newcomer is broadcast to everyone; every existing player is sent
    /// to the newcomer only.
    pub fn spawn_player<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        player_id: PlayerId,
        username: &str,
        body: BodyHandle,
    ) -> Result<Vec<Outbound>, ServerError> {
        if self.players.contains_key(&player_id) {
            return Err(ServerError::DuplicatePlayer(player_id));
        }

        world.set_position(body, SPAWN_POSITION);
        world.set_rotation(body, Quat::IDENTITY);
        world.set_linear_velocity(body, Vec3::ZERO);
        world.set_angular_velocity(body, Vec3::ZERO);
        world.set_kinematic(body, false);

        let player = ServerPlayer::new(player_id, username, body);
        let mut outbound = vec![Outbound::broadcast(ServerPacket::SpawnPlayer(
            player.spawn_message(SPAWN_POSITION),
        ))];
        outbound.extend(self.players.values().map(|existing| {
            let position = world.position(existing.body);
            Outbound::to(
                player_id,
                ServerPacket::SpawnPlayer(existing.spawn_message(position)),
            )
        }));

        let name = player.spawn_message(SPAWN_POSITION).display_name();
        self.players.insert(player_id, player);
        info!(player_id, players = self.players.len(), "spawned {}", name);

        Ok(outbound)
    }

    /// Remove `player_id` and hand back its state so the caller can destroy
    /// the body.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<ServerPlayer, ServerError> {
        let player = self
            .players
            .remove(&player_id)
            .ok_or(ServerError::UnknownPlayer(player_id))?;
        info!(player_id, players = self.players.len(), "player disconnected");
        Ok(player)
    }

    /// Dispatch a decoded client packet that does not require a new body.
    ///
    /// Name packets are answered by `spawn_player`, which needs a body from
    /// the caller's world; here they yield `None`.
    pub fn handle_packet<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        player_id: PlayerId,
        packet: ClientPacket,
    ) -> Result<Option<BatchOutcome>, ServerError> {
        match packet {
            ClientPacket::PlayerInput(batch) => self.process_batch(world, player_id, &batch).map(Some),
            ClientPacket::PlayerName(_) => Ok(None),
        }
    }

    /// Simulate the ticks of `batch` that have not been simulated yet.
    pub fn process_batch<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        player_id: PlayerId,
        batch: &InputBatch,
    ) -> Result<BatchOutcome, ServerError> {
        let player = self
            .players
            .get(&player_id)
            .ok_or(ServerError::UnknownPlayer(player_id))?;
        let body = player.body;

        let (start, last_tick) = match admit(batch, player.last_processed_input_tick) {
            Admission::Empty => {
                trace!(player_id, "dropping empty input batch");
                return Ok(BatchOutcome::Empty);
            }
            Admission::Stale { last_tick, cursor } => {
                trace!(player_id, last_tick, cursor, "dropping stale input batch");
                return Ok(BatchOutcome::Stale { last_tick, cursor });
            }
            Admission::Replay { start, last_tick } => (start, last_tick),
        };

        let frozen = self.freeze_others(world, player_id);
        world.set_kinematic(body, false);

        let end = batch.len() - 1;
        let updates: Vec<MovementUpdate> = batch.samples[start..end]
            .iter()
            .map(|sample| {
                self.policy.simulate_tick(world, body, sample, self.dt);
                MovementUpdate {
                    player_id,
                    snapshot: AuthoritativeSnapshot::capture(
                        world,
                        body,
                        sample.tick.wrapping_add(1),
                    ),
                }
            })
            .collect();

        Self::restore(world, frozen);

        if let Some(player) = self.players.get_mut(&player_id) {
            player.last_processed_input_tick = Some(last_tick);
        }
        debug!(
            player_id,
            replayed = updates.len(),
            cursor = last_tick,
            "simulated input batch"
        );

        Ok(BatchOutcome::Simulated {
            updates,
            cursor: last_tick,
        })
    }

    fn freeze_others<W: PhysicsWorld + ?Sized>(
        &self,
        world: &mut W,
        player_id: PlayerId,
    ) -> Vec<Frozen> {
        self.players
            .values()
            .filter(|other| other.id != player_id)
            .map(|other| {
                let frozen = Frozen {
                    body: other.body,
                    linear_velocity: world.linear_velocity(other.body),
                    angular_velocity: world.angular_velocity(other.body),
                };
                world.set_kinematic(other.body, true);
                frozen
            })
            .collect()
    }

    fn restore<W: PhysicsWorld + ?Sized>(world: &mut W, frozen: Vec<Frozen>) {
        for entry in frozen {
            world.set_kinematic(entry.body, false);
            world.set_linear_velocity(entry.body, entry.linear_velocity);
            world.set_angular_velocity(entry.body, entry.angular_velocity);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
