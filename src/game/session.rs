//! Session manager: connection lifecycle and client intents

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::util::time::unix_millis;
use crate::ws::broadcast::Broadcaster;
use crate::ws::protocol::{ClientMsg, PlayerUpdate, ServerMsg, SessionId, WelcomeInfo};

use super::combat::Bullet;
use super::physics::PhysicsSystem;
use super::snapshot::SnapshotBuilder;
use super::validation::IntentValidator;
use super::world::{Player, WorldState};
use super::{ArenaRules, Intent, PlayerInput};

/// Applies intents from connections to the world.
///
/// Intents that refer to a player which has since died or left are dropped
/// silently; a disconnect racing an in-flight move is normal, not an error.
pub struct SessionManager {
    sessions: BTreeSet<SessionId>,
    validator: IntentValidator,
    rules: ArenaRules,
    rng: ChaCha8Rng,
}

impl SessionManager {
    pub fn new(rules: ArenaRules, validator: IntentValidator, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            sessions: BTreeSet::new(),
            validator,
            rules,
            rng,
        }
    }

    /// Connected sessions, alive or not
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, session_id: SessionId) -> bool {
        self.sessions.contains(&session_id)
    }

    /// Dispatch one intent
    pub fn handle(&mut self, world: &mut WorldState, out: &Broadcaster, input: PlayerInput) {
        let id = input.session_id;
        match input.intent {
            Intent::Join => self.join(world, out, id),
            Intent::Disconnect => self.disconnect(world, out, id),
            Intent::Client(msg) => {
                if !self.is_connected(id) {
                    debug!(session_id = %id, "Intent from unknown session dropped");
                    return;
                }
                match msg {
                    ClientMsg::PlayerMovement { x, y, angle } => {
                        self.move_player(world, out, id, x, y, angle)
                    }
                    ClientMsg::ShootBullet { x, y, angle, speed } => {
                        self.shoot(world, out, id, x, y, angle, speed)
                    }
                    ClientMsg::Respawn(_) => self.respawn(world, out, id),
                    ClientMsg::Ping { t } => out.unicast(id, &ServerMsg::Pong { t }),
                }
            }
        }
    }

    /// Register a connection, give it a player and the full world snapshot
    pub fn join(&mut self, world: &mut WorldState, out: &Broadcaster, id: SessionId) {
        if !self.sessions.insert(id) {
            warn!(session_id = %id, "Session already joined");
            return;
        }

        let player = self.allocate_player(world, id);

        out.unicast(
            id,
            &ServerMsg::Welcome(WelcomeInfo {
                player_id: id,
                map_width: self.rules.map_width,
                map_height: self.rules.map_height,
                tick_rate: self.rules.tick_rate,
                server_time: unix_millis(),
            }),
        );
        out.unicast(id, &ServerMsg::CurrentPlayers(SnapshotBuilder::players(world)));
        out.unicast(id, &ServerMsg::CurrentBullets(SnapshotBuilder::bullets(world)));
        out.broadcast_except(
            id,
            &ServerMsg::NewPlayer(PlayerUpdate {
                player_id: id,
                player_info: player.info(),
            }),
        );

        info!(
            session_id = %id,
            x = player.x,
            y = player.y,
            player_count = world.player_count(),
            "Player joined"
        );
    }

    /// Overwrite the sender's position and facing
    pub fn move_player(
        &mut self,
        world: &mut WorldState,
        out: &Broadcaster,
        id: SessionId,
        x: f32,
        y: f32,
        angle: f32,
    ) {
        let Some(player) = world.player_mut(id) else {
            debug!(session_id = %id, "Move for absent player ignored");
            return;
        };

        let valid = match self.validator.validate_move(x, y, angle) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Rejected movement");
                return;
            }
        };

        player.x = valid.x;
        player.y = valid.y;
        player.angle = valid.angle;

        out.broadcast(&ServerMsg::PlayerMoved(PlayerUpdate {
            player_id: id,
            player_info: player.info(),
        }));
    }

    /// Fire a bullet owned by the sender. Any connected session may shoot,
    /// including one whose player is dead and not yet respawned.
    #[allow(clippy::too_many_arguments)]
    pub fn shoot(
        &mut self,
        world: &mut WorldState,
        out: &Broadcaster,
        id: SessionId,
        x: f32,
        y: f32,
        angle: f32,
        speed: Option<f32>,
    ) {
        let valid = match self.validator.validate_shot(x, y, angle, speed) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Rejected shot");
                return;
            }
        };

        let bullet = Bullet::new(id, valid.x, valid.y, valid.angle, &self.rules);
        let info = bullet.info();
        world.spawn_bullet(bullet);

        debug!(session_id = %id, bullet_id = %info.id, "Bullet fired");
        out.broadcast(&ServerMsg::NewBullet(info));
    }

    /// Reallocate the sender's player, dead or alive
    pub fn respawn(&mut self, world: &mut WorldState, out: &Broadcaster, id: SessionId) {
        let player = self.allocate_player(world, id);

        out.broadcast(&ServerMsg::NewPlayer(PlayerUpdate {
            player_id: id,
            player_info: player.info(),
        }));

        info!(session_id = %id, x = player.x, y = player.y, "Player respawned");
    }

    /// Remove the session and its player. Repeated calls are no-ops.
    pub fn disconnect(&mut self, world: &mut WorldState, out: &Broadcaster, id: SessionId) {
        if !self.sessions.remove(&id) {
            debug!(session_id = %id, "Disconnect for unknown session ignored");
            return;
        }

        world.remove_player(id);
        out.broadcast(&ServerMsg::Disconnect(id));

        info!(
            session_id = %id,
            player_count = world.player_count(),
            "Player disconnected"
        );
    }

    fn allocate_player(&mut self, world: &mut WorldState, id: SessionId) -> Player {
        let (x, y) = PhysicsSystem::random_spawn(&mut self.rng, &self.rules);
        let player = Player::new(id, x, y, self.rules.max_health);
        world.insert_player(player.clone());
        player
    }
}
