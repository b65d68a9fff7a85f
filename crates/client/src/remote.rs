//! Table of players other than the local one.
//!
//! Remote players are never predicted; the client just keeps the newest
//! authoritative movement for each so a renderer can place them.

use std::collections::BTreeMap;

use kinesync_sim::{AuthoritativeSnapshot, PlayerId, PlayerSpawn, tick_is_newer};

/// What the client knows about one remote player.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub spawn: Option<PlayerSpawn>,
    pub latest: Option<AuthoritativeSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct RemotePlayers {
    players: BTreeMap<PlayerId, RemotePlayer>,
}

impl RemotePlayers {
    pub fn apply_spawn(&mut self, spawn: PlayerSpawn) {
        let entry = self.players.entry(spawn.player_id).or_insert(RemotePlayer {
            spawn: None,
            latest: None,
        });
        entry.spawn = Some(spawn);
    }

    /// Keep `snapshot` if it is newer than what is stored.
    pub fn apply_movement(&mut self, player_id: PlayerId, snapshot: AuthoritativeSnapshot) -> bool {
        let entry = self.players.entry(player_id).or_insert(RemotePlayer {
            spawn: None,
            latest: None,
        });
        match entry.latest {
            Some(current) if !tick_is_newer(snapshot.tick, current.tick) => false,
            _ => {
                entry.latest = Some(snapshot);
                true
            }
        }
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&RemotePlayer> {
        self.players.get(&player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &RemotePlayer)> {
        self.players.iter()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
