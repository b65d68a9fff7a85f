//! Kinesync Loopback
//!
//! Runs client sessions against a server session in one process. Every
//! message crosses a [`LossyLink`] as encoded wire bytes, so the loop
//! exercises the protocol exactly as a real transport would, minus sockets.
//!
//! Each client owns a private physics world holding only its own body. The
//! server owns one world holding every player's body.

#![deny(unsafe_code)]

pub mod input;
pub mod link;

use kinesync_client::smoothing::VisualSmoother;
use kinesync_client::{ClientSession, InputSource, PredictionStats};
use kinesync_server::{Outbound, ServerError, ServerSession};
use kinesync_sim::{
    AuthoritativeSnapshot, BodyDesc, BodyHandle, GroundVolume, PhysicsWorld, PlayerId,
    ReferenceWorld, SimConfig, Vec3, combined_digest,
};
use kinesync_wire::{ClientPacket, WireError};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub use link::{LinkConfig, LinkStats, LossyLink};

/// Half width of the square ground slab every world is built on.
pub const ARENA_HALF_EXTENT: f32 = 500.0;

#[derive(Debug, Error)]
pub enum LoopbackError {
    #[error("no connected client with id {0}")]
    UnknownClient(PlayerId),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// A world with the shared ground slab on the configured ground layer.
pub fn arena_world(config: &SimConfig) -> ReferenceWorld {
    let mut world = ReferenceWorld::default();
    world.add_ground(GroundVolume::slab(
        0.0,
        ARENA_HALF_EXTENT,
        config.movement.ground_layer,
    ));
    world
}

// ============================================================================
// Clients
// ============================================================================

/// One simulated remote machine.
pub struct LoopbackClient {
    session: ClientSession,
    world: ReferenceWorld,
    input: Box<dyn InputSource>,
    uplink: LossyLink,
    downlink: LossyLink,
}

impl LoopbackClient {
    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn world(&self) -> &ReferenceWorld {
        &self.world
    }

    pub fn body(&self) -> BodyHandle {
        self.session.body()
    }

    pub fn stats(&self) -> PredictionStats {
        self.session.stats()
    }

    pub fn uplink_stats(&self) -> LinkStats {
        self.uplink.stats()
    }

    pub fn downlink_stats(&self) -> LinkStats {
        self.downlink.stats()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Fixed-tick driver for one server and any number of clients.
pub struct Loopback {
    config: SimConfig,
    link: LinkConfig,
    seed: u64,
    now: u64,
    next_player_id: PlayerId,
    server: ServerSession,
    server_world: ReferenceWorld,
    clients: Vec<(PlayerId, LoopbackClient)>,
    smoother: VisualSmoother,
}

impl Loopback {
    pub fn new(config: SimConfig, link: LinkConfig, seed: u64) -> Self {
        Self {
            server: ServerSession::new(&config),
            server_world: arena_world(&config),
            config,
            link,
            seed,
            now: 0,
            next_player_id: 1,
            clients: Vec::new(),
            smoother: VisualSmoother::default(),
        }
    }

    /// Replace the fade applied to each client's error offset.
    pub fn with_smoother(mut self, smoother: VisualSmoother) -> Self {
        self.smoother = smoother;
        self
    }

    /// Driver ticks run so far.
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn server(&self) -> &ServerSession {
        &self.server
    }

    pub fn server_world(&self) -> &ReferenceWorld {
        &self.server_world
    }

    /// Direct access to authoritative physics, for injecting disturbances.
    pub fn server_world_mut(&mut self) -> &mut ReferenceWorld {
        &mut self.server_world
    }

    pub fn client(&self, player_id: PlayerId) -> Option<&LoopbackClient> {
        self.clients
            .iter()
            .find(|(id, _)| *id == player_id)
            .map(|(_, client)| client)
    }

    pub fn clients(&self) -> impl Iterator<Item = (PlayerId, &LoopbackClient)> {
        self.clients.iter().map(|(id, client)| (*id, client))
    }

    /// Authoritative body of `player_id`, once the server has spawned it.
    pub fn server_body(&self, player_id: PlayerId) -> Option<BodyHandle> {
        self.server.player(player_id).map(|p| p.body)
    }

    /// Add a client and queue its name message. Returns its player id.
    pub fn connect(&mut self, username: &str, input: Box<dyn InputSource>) -> PlayerId {
        let player_id = self.next_player_id;
        self.next_player_id = self.next_player_id.wrapping_add(1);

        let mut world = arena_world(&self.config);
        let body = world.add_body(BodyDesc::default());
        let link_seed = self.seed ^ (u64::from(player_id) << 32);

        let mut client = LoopbackClient {
            session: ClientSession::new(player_id, body, &self.config),
            world,
            input,
            uplink: LossyLink::new(self.link, link_seed),
            downlink: LossyLink::new(self.link, link_seed ^ 0xdead_beef),
        };

        let hello = ClientPacket::PlayerName(username.to_string());
        client.uplink.send(self.now, hello.channel(), hello.encode());
        self.clients.push((player_id, client));

        info!(player_id, username, "client connected");
        player_id
    }

    /// Drop a client and its authoritative body.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), LoopbackError> {
        let index = self
            .clients
            .iter()
            .position(|(id, _)| *id == player_id)
            .ok_or(LoopbackError::UnknownClient(player_id))?;
        self.clients.remove(index);

        // A client whose name never arrived has no server state.
        if self.server.player(player_id).is_some() {
            let player = self.server.disconnect(player_id)?;
            self.server_world.remove_body(player.body);
        }
        Ok(())
    }

    /// Run one fixed tick on every client, then let the server drain its
    /// inbound traffic.
    pub fn step(&mut self) {
        let now = self.now;
        let frame_dt = self.config.fixed_delta();

        for (player_id, client) in &mut self.clients {
            for bytes in client.downlink.deliver(now) {
                if let Err(err) = client.session.handle_bytes(&bytes) {
                    warn!(player_id = *player_id, %err, "dropping malformed server packet");
                }
            }

            let output = client.session.tick_with(&mut client.world, client.input.as_mut());
            // One render frame per tick.
            client.session.decay_error_offset(&self.smoother, frame_dt);
            if !output.batch.is_empty() {
                let packet = ClientPacket::PlayerInput(output.batch);
                client.uplink.send(now, packet.channel(), packet.encode());
            }
        }

        let mut inbound = Vec::new();
        for (player_id, client) in &mut self.clients {
            for bytes in client.uplink.deliver(now) {
                inbound.push((*player_id, bytes));
            }
        }
        for (player_id, bytes) in inbound {
            if let Err(err) = self.dispatch(player_id, &bytes) {
                warn!(player_id, %err, "dropping client packet");
            }
        }

        self.now += 1;
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    fn dispatch(&mut self, player_id: PlayerId, bytes: &[u8]) -> Result<(), LoopbackError> {
        let outbound = match ClientPacket::decode(bytes)? {
            ClientPacket::PlayerName(username) => {
                let body = self.server_world.add_body(BodyDesc::default());
                match self
                    .server
                    .spawn_player(&mut self.server_world, player_id, &username, body)
                {
                    Ok(outbound) => outbound,
                    Err(err) => {
                        self.server_world.remove_body(body);
                        return Err(err.into());
                    }
                }
            }
            packet => {
                if self.server.player(player_id).is_none() {
                    trace!(player_id, "input before spawn");
                    return Ok(());
                }
                self.server
                    .handle_packet(&mut self.server_world, player_id, packet)?
                    .map(|outcome| outcome.into_outbound())
                    .unwrap_or_default()
            }
        };

        self.route(outbound);
        Ok(())
    }

    fn route(&mut self, outbound: Vec<Outbound>) {
        let now = self.now;
        for message in outbound {
            let channel = message.packet.channel();
            let bytes = message.packet.encode();
            for (player_id, client) in &mut self.clients {
                if message.recipients.includes(*player_id) {
                    client.downlink.send(now, channel, bytes.clone());
                }
            }
        }
        debug!(now, "routed server messages");
    }

    /// Per-client prediction counters, ordered by player id.
    pub fn prediction_stats(&self) -> Vec<(PlayerId, PredictionStats)> {
        let mut stats: Vec<_> = self
            .clients
            .iter()
            .map(|(id, client)| (*id, client.stats()))
            .collect();
        stats.sort_by_key(|(id, _)| *id);
        stats
    }

    /// Squared distance between a client's predicted state at the tick of
    /// its newest snapshot and that snapshot.
    pub fn last_snapshot_error(&self, player_id: PlayerId) -> Option<f32> {
        let client = self.client(player_id)?;
        let snapshot = client.session.latest_snapshot()?;
        let predicted = client.session.predicted_state_at(snapshot.tick)?;
        Some(predicted.position.distance_squared(snapshot.position))
    }

    /// Digest over every authoritative body, in player id order.
    pub fn server_digest(&self) -> u64 {
        let snapshots: Vec<_> = self
            .server
            .players()
            .map(|player| AuthoritativeSnapshot::capture(&self.server_world, player.body, 0))
            .collect();
        combined_digest(&snapshots)
    }

    pub fn client_position(&self, player_id: PlayerId) -> Option<Vec3> {
        let client = self.client(player_id)?;
        Some(client.world.position(client.body()))
    }
}

// ============================================================================
// Tests
// ============================================================================
