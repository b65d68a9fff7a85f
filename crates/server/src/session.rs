//! Per-player server state.

use kinesync_sim::{BodyHandle, PlayerId, PlayerSpawn, Tick, Vec3};

/// Where every player's body is placed when it joins.
pub const SPAWN_POSITION: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// A connected player as the server sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerPlayer {
    pub id: PlayerId,
    pub username: String,
    pub body: BodyHandle,
    /// Tick of the last sample of the newest batch simulated for this player.
    /// `None` until the first non-empty batch arrives.
    pub last_processed_input_tick: Option<Tick>,
}

impl ServerPlayer {
    pub fn new(id: PlayerId, username: impl Into<String>, body: BodyHandle) -> Self {
        Self {
            id,
            username: username.into(),
            body,
            last_processed_input_tick: None,
        }
    }

    /// Spawn announcement for this player at `position`.
    pub fn spawn_message(&self, position: Vec3) -> PlayerSpawn {
        PlayerSpawn {
            player_id: self.id,
            username: self.username.clone(),
            position,
        }
    }
}
