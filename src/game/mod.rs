//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod physics;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod validation;
pub mod world;

pub use arena::{Arena, ArenaHandle};

use crate::util::time::SIMULATION_TPS;
use crate::ws::protocol::{ClientMsg, SessionId};

/// Fixed arena constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaRules {
    pub map_width: f32,
    pub map_height: f32,
    pub player_radius: f32,
    pub bullet_radius: f32,
    /// Bullet travel per tick
    pub bullet_speed: f32,
    /// Bullet lifetime in ticks
    pub bullet_lifetime: u32,
    /// Health removed per hit
    pub damage: u32,
    pub max_health: u32,
    pub tick_rate: u32,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            map_width: 800.0,
            map_height: 600.0,
            player_radius: 10.0,
            bullet_radius: 5.0,
            bullet_speed: 10.0,
            bullet_lifetime: 100,
            damage: 20,
            max_health: 100,
            tick_rate: SIMULATION_TPS,
        }
    }
}

/// Something a connection asked the arena to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Connection opened
    Join,
    /// Decoded client event
    Client(ClientMsg),
    /// Connection closed
    Disconnect,
}

/// Intent received from a connection
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub session_id: SessionId,
    pub intent: Intent,
    pub received_at: u64,
}
