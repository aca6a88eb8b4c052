//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON text frame shaped `{"event": "<name>", "data": <payload>}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one connection, stable for the connection's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Client-reported position and facing
    PlayerMovement { x: f32, y: f32, angle: f32 },

    /// Fire a bullet from the given origin
    ShootBullet {
        x: f32,
        y: f32,
        angle: f32,
        /// Advisory only, the server always uses its own bullet speed
        #[serde(default)]
        speed: Option<f32>,
    },

    /// Reallocate the sender's player. Any payload (absent, `null`, or an
    /// object) is accepted and ignored.
    Respawn(Option<serde_json::Map<String, serde_json::Value>>),

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// Decode one inbound text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMsg {
    /// First message on a new connection
    Welcome(WelcomeInfo),

    /// Full player snapshot, unicast on join
    CurrentPlayers(BTreeMap<SessionId, PlayerInfo>),

    /// Full bullet snapshot, unicast on join
    CurrentBullets(Vec<BulletInfo>),

    /// A player joined or respawned
    NewPlayer(PlayerUpdate),

    /// A player reported a new position
    PlayerMoved(PlayerUpdate),

    /// A bullet was fired
    NewBullet(BulletInfo),

    /// A bullet struck a player
    BulletHit(BulletHit),

    /// A player's health reached zero
    PlayerDied(SessionId),

    /// Full replacement of the live bullet list, sent every tick
    UpdateBullets(Vec<BulletInfo>),

    /// A session ended
    Disconnect(SessionId),

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    /// Encode as one outbound text frame
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Connection greeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeInfo {
    pub player_id: SessionId,
    pub map_width: f32,
    pub map_height: f32,
    pub tick_rate: u32,
    pub server_time: u64,
}

/// Player record as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub x: f32,
    pub y: f32,
    /// Facing in radians
    pub angle: f32,
    /// Health (0-100)
    pub health: u32,
}

/// A player record tagged with its owner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub player_id: SessionId,
    pub player_info: PlayerInfo,
}

/// Bullet record as seen by clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletInfo {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Direction of travel in radians
    pub angle: f32,
    /// Distance per tick
    pub speed: f32,
    pub owner_id: SessionId,
    /// Ticks left before expiry
    pub lifetime: u32,
}

/// Collision report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletHit {
    pub bullet_id: Uuid,
    pub player_id: SessionId,
    /// Health after the hit was applied
    pub health: u32,
}

/// Wire codec errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed client message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),
}
