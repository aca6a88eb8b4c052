//! Snapshot and delta building for network transmission

use std::collections::BTreeMap;

use crate::ws::protocol::{BulletHit, BulletInfo, PlayerInfo, ServerMsg, SessionId};

use super::simulation::{TickEvent, TickReport};
use super::world::WorldState;

/// Builds wire views of the world
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Every live player keyed by session
    pub fn players(world: &WorldState) -> BTreeMap<SessionId, PlayerInfo> {
        world.players().map(|p| (p.id, p.info())).collect()
    }

    /// Every live bullet in fire order
    pub fn bullets(world: &WorldState) -> Vec<BulletInfo> {
        world.bullets().iter().map(|b| b.info()).collect()
    }

    /// Messages describing one completed tick: hits and deaths in the order they
    /// happened, then the full-replace bullet list.
    pub fn tick_messages(report: &TickReport, world: &WorldState) -> Vec<ServerMsg> {
        let mut messages: Vec<ServerMsg> = report
            .events
            .iter()
            .map(|event| match event {
                TickEvent::Hit(hit) => ServerMsg::BulletHit(BulletHit {
                    bullet_id: hit.bullet_id,
                    player_id: hit.target_id,
                    health: hit.health,
                }),
                TickEvent::Died(id) => ServerMsg::PlayerDied(*id),
            })
            .collect();

        messages.push(ServerMsg::UpdateBullets(Self::bullets(world)));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::simulation::step;
    use crate::game::world::{Bullet, Player};
    use crate::game::ArenaRules;

    #[test]
    fn tick_messages_end_with_the_bullet_list() {
        let rules = ArenaRules::default();
        let mut world = WorldState::new();
        let mut victim = Player::new(SessionId(1), 110.0, 100.0, 20);
        victim.angle = 1.0;
        world.insert_player(victim);
        let lethal = Bullet::new(SessionId(2), 100.0, 100.0, 0.0, &rules);
        let lethal_id = lethal.id;
        world.spawn_bullet(lethal);
        let stray = Bullet::new(SessionId(2), 400.0, 500.0, 0.0, &rules);
        let stray_id = stray.id;
        world.spawn_bullet(stray);

        let report = step(&mut world, &rules);
        let messages = SnapshotBuilder::tick_messages(&report, &world);

        assert_eq!(messages.len(), 3);
        assert_eq!(
            messages[0],
            ServerMsg::BulletHit(BulletHit {
                bullet_id: lethal_id,
                player_id: SessionId(1),
                health: 0,
            })
        );
        assert_eq!(messages[1], ServerMsg::PlayerDied(SessionId(1)));
        match &messages[2] {
            ServerMsg::UpdateBullets(bullets) => {
                assert_eq!(bullets.len(), 1);
                assert_eq!(bullets[0].id, stray_id);
                assert!(bullets.iter().all(|b| b.id != lethal_id));
            }
            other => panic!("expected updateBullets, got {other:?}"),
        }
    }

    #[test]
    fn player_snapshot_reflects_world() {
        let mut world = WorldState::new();
        world.insert_player(Player::new(SessionId(4), 50.0, 60.0, 100));

        let players = SnapshotBuilder::players(&world);
        assert_eq!(
            players.get(&SessionId(4)),
            Some(&PlayerInfo {
                x: 50.0,
                y: 60.0,
                angle: 0.0,
                health: 100
            })
        );
    }
}
