//! Kinesync Client
//!
//! The client predicts its own player every fixed tick and reconciles against
//! authoritative snapshots as they arrive. It owns:
//! - Input and predicted-state histories (one slot per tick)
//! - The redundant input upload
//! - Rewind-and-replay on divergence
//! - The render-only error offset that hides small corrections
//!
//! # Tick Flow
//!
//! `predict_tick` captures the sample, records it together with the pre-step
//! state, steps physics, builds the upload, advances the tick, and finally
//! reconciles if a newer snapshot has arrived. Message handling runs between
//! ticks on the same thread; nothing here is reentrant.

#![deny(unsafe_code)]

pub mod batch;
pub mod remote;
pub mod smoothing;

use kinesync_sim::{
    AuthoritativeSnapshot, BodyHandle, ErrorOffset, InputBatch, InputSample, Intents,
    MovementPolicy, MovementUpdate, PhysicsWorld, PlayerId, PlayerSpawn, PredictedState, Quat,
    SimConfig, Tick, TickHistory, Vec3, tick_is_newer, tick_span,
};
use kinesync_wire::{ServerPacket, WireError};
use tracing::{debug, trace, warn};

use batch::unacknowledged_batch;
use remote::RemotePlayers;
use smoothing::VisualSmoother;

// ============================================================================
// Reconciliation Parameters
// ============================================================================

/// Squared positional error at or below which prediction counts as correct.
pub const CONVERGENCE_EPSILON_SQ: f32 = 0.000_000_1;

/// Squared distance between drawn and corrected position at or above which
/// the correction is shown as a snap instead of being smoothed.
pub const SNAP_DISTANCE_SQ: f32 = 4.0;

// ============================================================================
// Input Capture
// ============================================================================

/// Source of the player's intents and look rotation for a tick.
pub trait InputSource {
    fn capture(&mut self, tick: Tick) -> (Intents, Quat);
}

impl<F> InputSource for F
where
    F: FnMut(Tick) -> (Intents, Quat),
{
    fn capture(&mut self, tick: Tick) -> (Intents, Quat) {
        self(tick)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No authoritative snapshot has been received yet.
    NoSnapshot,
    /// The newest snapshot is not newer than the last corrected tick.
    Stale { tick: Tick },
    /// Prediction matched; no rewind.
    Converged { tick: Tick },
    /// Rewound and replayed; the jump is hidden by the error offset.
    Smoothed { tick: Tick, replayed: u16 },
    /// Rewound and replayed; the jump was too large and is shown as a snap.
    Snapped { tick: Tick, replayed: u16 },
}

/// Result of one predicted tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// The upload to send unreliably this tick.
    pub batch: InputBatch,
    pub reconcile: ReconcileOutcome,
}

/// Running counters for prediction quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionStats {
    pub ticks_predicted: u64,
    pub converged: u64,
    pub smoothed: u64,
    pub snapped: u64,
    pub ticks_replayed: u64,
    pub stale_snapshots: u64,
}

impl PredictionStats {
    pub fn rewinds(&self) -> u64 {
        self.smoothed + self.snapped
    }
}

// ============================================================================
// Client Session
// ============================================================================

/// Prediction and reconciliation state for the locally controlled player.
pub struct ClientSession {
    player_id: PlayerId,
    body: BodyHandle,
    policy: MovementPolicy,
    dt: f32,
    /// Tick that the next `predict_tick` will simulate.
    tick: Tick,
    inputs: TickHistory<InputSample>,
    states: TickHistory<PredictedState>,
    /// Newest snapshot received for the local player.
    latest_snapshot: Option<AuthoritativeSnapshot>,
    last_corrected_tick: Tick,
    error_offset: ErrorOffset,
    local_spawn: Option<PlayerSpawn>,
    remote_players: RemotePlayers,
    stats: PredictionStats,
}

impl ClientSession {
    /// Create a session predicting `body` for `player_id`, starting at tick 0.
    pub fn new(player_id: PlayerId, body: BodyHandle, config: &SimConfig) -> Self {
        Self {
            player_id,
            body,
            policy: MovementPolicy::new(config.movement.clone()),
            dt: config.fixed_delta(),
            tick: 0,
            inputs: TickHistory::new(config.history_capacity),
            states: TickHistory::new(config.history_capacity),
            latest_snapshot: None,
            last_corrected_tick: 0,
            error_offset: ErrorOffset::ZERO,
            local_spawn: None,
            remote_players: RemotePlayers::default(),
            stats: PredictionStats::default(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Tick the next `predict_tick` will simulate.
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn last_corrected_tick(&self) -> Tick {
        self.last_corrected_tick
    }

    pub fn error_offset(&self) -> ErrorOffset {
        self.error_offset
    }

    pub fn latest_snapshot(&self) -> Option<&AuthoritativeSnapshot> {
        self.latest_snapshot.as_ref()
    }

    pub fn stats(&self) -> PredictionStats {
        self.stats
    }

    pub fn remote_players(&self) -> &RemotePlayers {
        &self.remote_players
    }

    pub fn local_spawn(&self) -> Option<&PlayerSpawn> {
        self.local_spawn.as_ref()
    }

    pub fn input_at(&self, tick: Tick) -> Option<&InputSample> {
        self.inputs.get(tick)
    }

    pub fn predicted_state_at(&self, tick: Tick) -> Option<&PredictedState> {
        self.states.get(tick)
    }

    /// Tick of the newest snapshot received, or 0 before any arrives.
    pub fn acknowledged_tick(&self) -> Tick {
        self.latest_snapshot.map_or(0, |s| s.tick)
    }

    /// Read the input source for the current tick.
    pub fn capture_input<I: InputSource + ?Sized>(&self, source: &mut I) -> InputSample {
        let (intents, look_rotation) = source.capture(self.tick);
        InputSample::new(self.tick, intents, look_rotation)
    }

    /// Run one fixed tick of prediction with `intents` and `look_rotation`.
    pub fn predict_tick<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        intents: Intents,
        look_rotation: Quat,
    ) -> TickOutput {
        let tick = self.tick;
        let sample = InputSample::new(tick, intents, look_rotation);

        self.inputs.record(tick, sample);
        self.states
            .record(tick, PredictedState::capture(world, self.body, tick));

        self.policy.simulate_tick(world, self.body, &sample, self.dt);
        self.stats.ticks_predicted += 1;

        let batch = unacknowledged_batch(&self.inputs, self.acknowledged_tick(), tick);

        self.tick = tick.wrapping_add(1);

        let reconcile = self.reconcile(world);
        TickOutput { batch, reconcile }
    }

    /// Capture from `source` and predict one tick.
    pub fn tick_with<W, I>(&mut self, world: &mut W, source: &mut I) -> TickOutput
    where
        W: PhysicsWorld + ?Sized,
        I: InputSource + ?Sized,
    {
        let sample = self.capture_input(source);
        self.predict_tick(world, sample.intents, sample.look_rotation)
    }

    /// Store an authoritative movement update. Only the local player's updates
    /// feed reconciliation; the rest go to the remote table.
    pub fn receive_movement(&mut self, update: MovementUpdate) {
        if update.player_id != self.player_id {
            self.remote_players
                .apply_movement(update.player_id, update.snapshot);
            return;
        }

        let snapshot = update.snapshot;
        match self.latest_snapshot {
            Some(current) if !tick_is_newer(snapshot.tick, current.tick) => {
                trace!(
                    tick = snapshot.tick,
                    newest = current.tick,
                    "dropping out-of-order snapshot"
                );
            }
            _ => self.latest_snapshot = Some(snapshot),
        }
    }

    pub fn receive_spawn(&mut self, spawn: PlayerSpawn) {
        if spawn.player_id == self.player_id {
            self.local_spawn = Some(spawn);
        } else {
            self.remote_players.apply_spawn(spawn);
        }
    }

    pub fn handle_packet(&mut self, packet: ServerPacket) {
        match packet {
            ServerPacket::SpawnPlayer(spawn) => self.receive_spawn(spawn),
            ServerPacket::PlayerMovement(update) => self.receive_movement(update),
        }
    }

    /// Decode and handle one server message.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let packet = ServerPacket::decode(bytes)?;
        self.handle_packet(packet);
        Ok(())
    }

    /// Compare the newest snapshot against prediction and correct if needed.
    ///
    /// Runs at most once per accepted snapshot and never rewinds past the
    /// snapshot's tick.
    pub fn reconcile<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> ReconcileOutcome {
        let Some(snapshot) = self.latest_snapshot else {
            return ReconcileOutcome::NoSnapshot;
        };

        if !tick_is_newer(snapshot.tick, self.last_corrected_tick) {
            if snapshot.tick != self.last_corrected_tick {
                self.stats.stale_snapshots += 1;
            }
            return ReconcileOutcome::Stale {
                tick: snapshot.tick,
            };
        }

        // A never-written slot cannot confirm anything; treat it as divergence.
        let diverged = self.states.get(snapshot.tick).is_none_or(|cached| {
            cached.position.distance_squared(snapshot.position) > CONVERGENCE_EPSILON_SQ
        });

        if !diverged {
            self.last_corrected_tick = snapshot.tick;
            self.stats.converged += 1;
            return ReconcileOutcome::Converged {
                tick: snapshot.tick,
            };
        }

        // A snapshot ahead of local prediction leaves nothing to replay.
        let replayed = if tick_is_newer(snapshot.tick, self.tick) {
            0
        } else {
            tick_span(snapshot.tick, self.tick)
        };
        debug!(
            tick = snapshot.tick,
            replayed, "correcting error at tick {}, rewinding {} ticks", snapshot.tick, replayed
        );
        if usize::from(replayed) >= self.inputs.capacity() {
            warn!(
                tick = snapshot.tick,
                replayed,
                capacity = self.inputs.capacity(),
                "rewind span reaches history capacity; replayed inputs may be aliased"
            );
        }

        let prev_position = world.position(self.body) + self.error_offset.position;
        let prev_rotation = world.rotation(self.body) * self.error_offset.rotation;

        snapshot.apply_to(world, self.body);
        self.replay(world, snapshot.tick, replayed);

        let position = world.position(self.body);
        let rotation = world.rotation(self.body);
        self.last_corrected_tick = snapshot.tick;

        if prev_position.distance_squared(position) >= SNAP_DISTANCE_SQ {
            self.error_offset = ErrorOffset::ZERO;
            self.stats.snapped += 1;
            ReconcileOutcome::Snapped {
                tick: snapshot.tick,
                replayed,
            }
        } else {
            self.error_offset = ErrorOffset {
                position: prev_position - position,
                rotation: rotation.inverse() * prev_rotation,
            };
            self.stats.smoothed += 1;
            ReconcileOutcome::Smoothed {
                tick: snapshot.tick,
                replayed,
            }
        }
    }

    /// Re-simulate `count` ticks starting at `from`, rewriting state history
    /// from the already-buffered inputs.
    fn replay<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, from: Tick, count: u16) {
        let mut tick = from;
        for _ in 0..count {
            self.states
                .record(tick, PredictedState::capture(world, self.body, tick));
            let sample = self
                .inputs
                .get(tick)
                .copied()
                .unwrap_or_else(|| InputSample::idle(tick));
            self.policy.simulate_tick(world, self.body, &sample, self.dt);
            tick = tick.wrapping_add(1);
        }
        self.stats.ticks_replayed += u64::from(count);
    }

    /// Fade the error offset by one render frame.
    pub fn decay_error_offset(&mut self, smoother: &VisualSmoother, frame_dt: f32) {
        self.error_offset = smoother.decay(self.error_offset, frame_dt);
    }

    /// Pose to draw: simulated pose plus the error offset.
    pub fn rendered_pose<W: PhysicsWorld + ?Sized>(&self, world: &W) -> (Vec3, Quat) {
        (
            world.position(self.body) + self.error_offset.position,
            world.rotation(self.body) * self.error_offset.rotation,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kinesync_sim::{BodyDesc, GroundVolume, LayerMask, ReferenceWorld};

    /// Zero-gravity world with one body at rest at (0, 1, 0).
    fn still_world() -> (ReferenceWorld, BodyHandle) {
        let mut world = ReferenceWorld::new(Vec3::ZERO);
        let body = world.add_body(BodyDesc::default());
        (world, body)
    }

    fn grounded_world() -> (ReferenceWorld, BodyHandle) {
        let mut world = ReferenceWorld::default();
        world.add_ground(GroundVolume::slab(0.0, 200.0, LayerMask::layer(0)));
        let body = world.add_body(BodyDesc::default());
        (world, body)
    }

    fn idle_ticks<W: PhysicsWorld>(client: &mut ClientSession, world: &mut W, count: usize) {
        for _ in 0..count {
            client.predict_tick(world, Intents::empty(), Quat::IDENTITY);
        }
    }

    fn update(player_id: PlayerId, tick: Tick, position: Vec3) -> MovementUpdate {
        MovementUpdate {
            player_id,
            snapshot: AuthoritativeSnapshot {
                tick,
                position,
                rotation: Quat::IDENTITY,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            },
        }
    }

    #[test]
    fn test_predict_records_pre_step_state() {
        let (mut world, body) = grounded_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());

        let before = world.position(body);
        client.predict_tick(&mut world, Intents::FORWARD, Quat::IDENTITY);

        let state = client.predicted_state_at(0).unwrap();
        assert_eq!(state.tick, 0);
        assert_eq!(state.position, before);
        assert_ne!(world.position(body), before);
        assert_eq!(client.input_at(0).map(|s| s.intents), Some(Intents::FORWARD));
        assert_eq!(client.current_tick(), 1);
    }

    #[test]
    fn test_batch_excludes_current_tick_and_grows_until_acked() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());

        let first = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);
        assert!(first.batch.is_empty());

        idle_ticks(&mut client, &mut world, 3);
        let out = client.predict_tick(&mut world, Intents::FORWARD, Quat::IDENTITY);
        let ticks: Vec<_> = out.batch.samples.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3]);

        client.receive_movement(update(1, 3, Vec3::new(0.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);
        let ticks: Vec<_> = out.batch.samples.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![3, 4]);
    }

    /// Snapshot equal to the cached prediction: no rewind.
    #[test]
    fn test_matching_snapshot_converges_without_rewind() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 104);

        client.receive_movement(update(1, 100, Vec3::new(0.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(out.reconcile, ReconcileOutcome::Converged { tick: 100 });
        assert_eq!(client.last_corrected_tick(), 100);
        assert_eq!(client.stats().rewinds(), 0);
        assert!(client.error_offset().is_zero());
    }

    /// Squared error of exactly 4 is a snap: overwrite, replay, zero offset.
    #[test]
    fn test_large_divergence_snaps() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 104);

        client.receive_movement(update(1, 100, Vec3::new(2.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(
            out.reconcile,
            ReconcileOutcome::Snapped {
                tick: 100,
                replayed: 5
            }
        );
        assert_eq!(world.position(body), Vec3::new(2.0, 1.0, 0.0));
        assert!(client.error_offset().is_zero());
        assert_eq!(client.last_corrected_tick(), 100);
        // History from the snapshot tick on now holds the corrected trajectory.
        for tick in 100..105 {
            let state = client.predicted_state_at(tick).unwrap();
            assert_eq!(state.position, Vec3::new(2.0, 1.0, 0.0));
        }
    }

    #[test]
    fn test_small_divergence_is_smoothed() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 104);

        client.receive_movement(update(1, 100, Vec3::new(1.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert!(matches!(out.reconcile, ReconcileOutcome::Smoothed { tick: 100, .. }));
        assert_eq!(world.position(body), Vec3::new(1.0, 1.0, 0.0));
        let offset = client.error_offset();
        assert_eq!(offset.position, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(offset.rotation, Quat::IDENTITY);

        // Drawn where it was before the correction.
        let (drawn, _) = client.rendered_pose(&world);
        assert_eq!(drawn, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_snapshot_ahead_of_prediction_replays_nothing() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 10);

        client.receive_movement(update(1, 16, Vec3::new(0.5, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(
            out.reconcile,
            ReconcileOutcome::Smoothed {
                tick: 16,
                replayed: 0
            }
        );
        assert_eq!(client.stats().ticks_replayed, 0);
        assert_eq!(world.position(body), Vec3::new(0.5, 1.0, 0.0));
        assert_eq!(client.last_corrected_tick(), 16);
        // History written by prediction is left alone.
        assert_eq!(
            client.predicted_state_at(5).map(|s| s.position),
            Some(Vec3::new(0.0, 1.0, 0.0))
        );
    }

    #[test]
    fn test_rotated_snapshot_sets_rotation_offset() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 20);

        let turned = Quat::from_rotation_y(0.3);
        let mut corrected = update(1, 15, Vec3::new(1.0, 1.0, 0.0));
        corrected.snapshot.rotation = turned;
        client.receive_movement(corrected);
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert!(matches!(out.reconcile, ReconcileOutcome::Smoothed { tick: 15, .. }));
        assert_eq!(world.rotation(body), turned);
        let offset = client.error_offset();
        assert!(offset.rotation.abs_diff_eq(Quat::from_rotation_y(-0.3), 1e-6));

        // Drawn with the rotation it had before the correction.
        let (_, drawn) = client.rendered_pose(&world);
        assert!(drawn.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_stale_snapshot_never_rewinds() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 20);

        client.receive_movement(update(1, 10, Vec3::new(0.0, 1.0, 0.0)));
        client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);
        assert_eq!(client.last_corrected_tick(), 10);

        // Older payload is dropped on receipt no matter how wrong it is.
        client.receive_movement(update(1, 9, Vec3::new(50.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(out.reconcile, ReconcileOutcome::Stale { tick: 10 });
        assert_eq!(world.position(body), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(client.stats().rewinds(), 0);
    }

    #[test]
    fn test_reconcile_runs_once_per_snapshot() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 20);

        client.receive_movement(update(1, 15, Vec3::new(1.0, 1.0, 0.0)));
        client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);
        client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);
        client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(client.stats().smoothed, 1);
    }

    #[test]
    fn test_replay_uses_buffered_inputs() {
        let (mut world, body) = grounded_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());

        idle_ticks(&mut client, &mut world, 30);
        for _ in 0..20 {
            client.predict_tick(&mut world, Intents::FORWARD, Quat::IDENTITY);
        }

        // Server saw the body half a metre to the side and at rest at tick 35.
        let cached = *client.predicted_state_at(35).unwrap();
        client.receive_movement(update(1, 35, cached.position + Vec3::new(0.5, 0.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::FORWARD, Quat::IDENTITY);

        assert_eq!(
            out.reconcile,
            ReconcileOutcome::Smoothed {
                tick: 35,
                replayed: 16
            }
        );
        // The buffered forward inputs were replayed on top of the correction.
        let corrected = world.position(body);
        assert_eq!(corrected.x, 0.5);
        assert!(corrected.z > cached.position.z);
        assert_eq!(client.stats().ticks_replayed, 16);
    }

    #[test]
    fn test_remote_movement_does_not_reconcile() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        idle_ticks(&mut client, &mut world, 10);

        client.receive_movement(update(2, 5, Vec3::new(9.0, 1.0, 0.0)));
        let out = client.predict_tick(&mut world, Intents::empty(), Quat::IDENTITY);

        assert_eq!(out.reconcile, ReconcileOutcome::NoSnapshot);
        assert_eq!(client.remote_players().len(), 1);
    }

    #[test]
    fn test_handle_bytes_dispatches_spawns() {
        let (_, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());

        let own = ServerPacket::SpawnPlayer(PlayerSpawn {
            player_id: 1,
            username: "me".to_string(),
            position: Vec3::new(0.0, 1.0, 0.0),
        });
        let other = ServerPacket::SpawnPlayer(PlayerSpawn {
            player_id: 2,
            username: String::new(),
            position: Vec3::new(0.0, 1.0, 0.0),
        });
        client.handle_bytes(&own.encode()).unwrap();
        client.handle_bytes(&other.encode()).unwrap();

        assert_eq!(client.local_spawn().map(|s| s.username.as_str()), Some("me"));
        assert!(client.remote_players().get(2).is_some());
        assert!(client.handle_bytes(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_input_source_closure() {
        let (mut world, body) = still_world();
        let mut client = ClientSession::new(1, body, &SimConfig::default());
        let mut source = |tick: Tick| {
            let intents = if tick % 2 == 0 { Intents::RIGHT } else { Intents::empty() };
            (intents, Quat::IDENTITY)
        };

        client.tick_with(&mut world, &mut source);
        client.tick_with(&mut world, &mut source);

        assert_eq!(client.input_at(0).map(|s| s.intents), Some(Intents::RIGHT));
        assert_eq!(client.input_at(1).map(|s| s.intents), Some(Intents::empty()));
    }
}
