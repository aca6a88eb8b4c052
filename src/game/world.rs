//! Authoritative world state: players keyed by session, live bullets in fire order

use std::collections::BTreeMap;

use crate::ws::protocol::{PlayerInfo, SessionId};

pub use super::combat::Bullet;

/// Player record (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub x: f32,
    pub y: f32,
    /// Last reported facing in radians
    pub angle: f32,
    pub health: u32,
}

impl Player {
    pub fn new(id: SessionId, x: f32, y: f32, health: u32) -> Self {
        Self {
            id,
            x,
            y,
            angle: 0.0,
            health,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            x: self.x,
            y: self.y,
            angle: self.angle,
            health: self.health,
        }
    }
}

/// Players and bullets. No validation lives here; callers decide what is allowed.
///
/// Players iterate in session order, which is join order since ids are allocated
/// monotonically. Dead players are removed, never flagged.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    players: BTreeMap<SessionId, Player>,
    bullets: Vec<Bullet>,
    /// Completed simulation ticks
    pub tick: u64,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the player for `player.id`
    pub fn insert_player(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id, player)
    }

    pub fn player(&self, id: SessionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: SessionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn remove_player(&mut self, id: SessionId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn spawn_bullet(&mut self, bullet: Bullet) {
        self.bullets.push(bullet);
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn bullets_mut(&mut self) -> &mut [Bullet] {
        &mut self.bullets
    }

    pub fn retain_bullets<F>(&mut self, keep: F)
    where
        F: FnMut(&Bullet) -> bool,
    {
        self.bullets.retain(keep);
    }

    pub fn bullet_count(&self) -> usize {
        self.bullets.len()
    }
}
