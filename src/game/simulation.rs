//! The fixed-rate simulation step
//!
//! [`step`] is a plain function of the world: it never awaits and never touches the
//! network, so it can be driven directly with a synthetic [`WorldState`].

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::SessionId;

use super::combat::{CombatSystem, HitResult};
use super::physics::PhysicsSystem;
use super::world::WorldState;
use super::ArenaRules;

/// Something observable that happened during a tick, in occurrence order
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    Hit(HitResult),
    Died(SessionId),
}

/// Outcome of one simulation step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<TickEvent>,
    /// Bullets pruned for leaving the map or running out of lifetime
    pub expired: usize,
}

/// Advance the world by one tick: integrate, resolve collisions, prune.
pub fn step(world: &mut WorldState, rules: &ArenaRules) -> TickReport {
    world.tick += 1;

    for bullet in world.bullets_mut() {
        bullet.update();
    }

    let mut events = Vec::new();
    let spent = resolve_collisions(world, rules, &mut events);

    let before = world.bullet_count();
    world.retain_bullets(|b| !spent.contains(&b.id));
    let after_hits = world.bullet_count();
    world.retain_bullets(|b| !b.is_expired() && PhysicsSystem::is_inside_map(b.x, b.y, rules));
    let expired = after_hits - world.bullet_count();

    if before != world.bullet_count() {
        debug!(
            tick = world.tick,
            hits = spent.len(),
            expired,
            remaining = world.bullet_count(),
            "Bullets removed"
        );
    }

    TickReport {
        tick: world.tick,
        events,
        expired,
    }
}

/// First match wins: each bullet damages at most one player, scanning players in
/// session order and skipping the bullet's owner. Returns the ids of spent bullets.
fn resolve_collisions(
    world: &mut WorldState,
    rules: &ArenaRules,
    events: &mut Vec<TickEvent>,
) -> HashSet<Uuid> {
    let mut spent = HashSet::new();

    // Bullets are only marked here, so indices stay valid while players are removed
    for idx in 0..world.bullet_count() {
        let bullet = &world.bullets()[idx];
        let (bullet_id, owner_id) = (bullet.id, bullet.owner_id);
        let target_id = world
            .players()
            .filter(|p| p.id != owner_id)
            .find(|p| bullet.check_hit(p.x, p.y, rules))
            .map(|p| p.id);

        let Some(target_id) = target_id else {
            continue;
        };
        let Some(target) = world.player_mut(target_id) else {
            continue;
        };

        let (health, killed) = CombatSystem::apply_damage(target.health, rules.damage);
        target.health = health;
        spent.insert(bullet_id);

        events.push(TickEvent::Hit(HitResult {
            bullet_id,
            shooter_id: owner_id,
            target_id,
            health,
            target_killed: killed,
        }));

        if killed {
            world.remove_player(target_id);
            events.push(TickEvent::Died(target_id));
            info!(session_id = %target_id, killer = %owner_id, "Player died");
        }
    }

    spent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::{Bullet, Player};
    use std::f32::consts::PI;

    fn rules() -> ArenaRules {
        ArenaRules::default()
    }

    fn player(id: u64, x: f32, y: f32) -> Player {
        Player::new(SessionId(id), x, y, 100)
    }

    fn bullet(owner: u64, x: f32, y: f32, angle: f32) -> Bullet {
        Bullet::new(SessionId(owner), x, y, angle, &rules())
    }

    fn hits(report: &TickReport) -> Vec<&HitResult> {
        report
            .events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Hit(hit) => Some(hit),
                TickEvent::Died(_) => None,
            })
            .collect()
    }

    fn deaths(report: &TickReport) -> Vec<SessionId> {
        report
            .events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Died(id) => Some(*id),
                TickEvent::Hit(_) => None,
            })
            .collect()
    }

    #[test]
    fn bullets_integrate_before_collision() {
        let mut world = WorldState::new();
        world.spawn_bullet(bullet(9, 100.0, 100.0, 0.0));

        let report = step(&mut world, &rules());

        assert_eq!(report.tick, 1);
        let b = &world.bullets()[0];
        assert!((b.x - 110.0).abs() < 1e-4);
        assert_eq!(b.lifetime, 99);
    }

    #[test]
    fn arena_scenario_first_joined_player_takes_the_hit() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 100.0, 100.0)); // A
        world.insert_player(player(2, 105.0, 100.0)); // B
        world.insert_player(player(3, 300.0, 300.0)); // C
        let shot = bullet(3, 80.0, 100.0, 0.0);
        let shot_id = shot.id;
        world.spawn_bullet(shot);

        let mut reports = Vec::new();
        for _ in 0..2 {
            reports.push(step(&mut world, &rules()));
            if !hits(reports.last().unwrap()).is_empty() {
                break;
            }
        }

        let all_hits: Vec<_> = reports.iter().flat_map(hits).collect();
        assert_eq!(all_hits.len(), 1);
        assert_eq!(all_hits[0].bullet_id, shot_id);
        assert_eq!(all_hits[0].target_id, SessionId(1));
        assert_eq!(all_hits[0].health, 80);
        assert_eq!(world.player(SessionId(1)).unwrap().health, 80);
        assert_eq!(world.player(SessionId(2)).unwrap().health, 100);
        assert!(world.bullets().iter().all(|b| b.id != shot_id));

        let next = step(&mut world, &rules());
        assert!(next.events.is_empty());
    }

    #[test]
    fn owner_is_immune_to_own_bullets() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 110.0, 100.0));
        world.spawn_bullet(bullet(1, 100.0, 100.0, 0.0));

        let report = step(&mut world, &rules());

        assert!(report.events.is_empty());
        assert_eq!(world.player(SessionId(1)).unwrap().health, 100);
        assert_eq!(world.bullet_count(), 1);
    }

    #[test]
    fn one_bullet_damages_at_most_one_player() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 110.0, 100.0));
        world.insert_player(player(2, 111.0, 100.0));
        world.spawn_bullet(bullet(5, 100.0, 100.0, 0.0));

        let report = step(&mut world, &rules());

        let hit = hits(&report);
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].target_id, SessionId(1));
        assert_eq!(world.player(SessionId(2)).unwrap().health, 100);
        assert_eq!(world.bullet_count(), 0);
    }

    #[test]
    fn every_overlapping_bullet_is_resolved_in_the_same_tick() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 110.0, 100.0));
        world.insert_player(player(2, 410.0, 300.0));
        world.spawn_bullet(bullet(5, 100.0, 100.0, 0.0));
        world.spawn_bullet(bullet(5, 400.0, 300.0, 0.0));
        world.spawn_bullet(bullet(5, 100.0, 100.0, 0.0));

        let report = step(&mut world, &rules());

        assert_eq!(hits(&report).len(), 3);
        assert_eq!(world.player(SessionId(1)).unwrap().health, 60);
        assert_eq!(world.player(SessionId(2)).unwrap().health, 80);
        assert_eq!(world.bullet_count(), 0);
    }

    #[test]
    fn five_hits_kill_exactly_once() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 110.0, 100.0));
        for _ in 0..6 {
            world.spawn_bullet(bullet(2, 100.0, 100.0, 0.0));
        }

        let report = step(&mut world, &rules());

        let hit = hits(&report);
        assert_eq!(hit.len(), 5);
        let healths: Vec<u32> = hit.iter().map(|h| h.health).collect();
        assert_eq!(healths, vec![80, 60, 40, 20, 0]);
        assert!(hit[4].target_killed);
        assert_eq!(deaths(&report), vec![SessionId(1)]);
        assert!(world.player(SessionId(1)).is_none());

        // The sixth bullet found nobody and keeps flying
        assert_eq!(world.bullet_count(), 1);
    }

    #[test]
    fn death_event_follows_its_hit() {
        let mut world = WorldState::new();
        let mut victim = player(1, 110.0, 100.0);
        victim.health = 20;
        world.insert_player(victim);
        world.spawn_bullet(bullet(2, 100.0, 100.0, 0.0));

        let report = step(&mut world, &rules());

        assert!(matches!(report.events[0], TickEvent::Hit(ref h) if h.health == 0));
        assert_eq!(report.events[1], TickEvent::Died(SessionId(1)));
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn health_stays_in_range_across_many_ticks() {
        let mut world = WorldState::new();
        for id in 1..=4 {
            world.insert_player(player(id, 100.0 * id as f32, 300.0));
        }
        for i in 0..40 {
            let angle = (i as f32) * PI / 20.0;
            world.spawn_bullet(bullet(99, 250.0, 300.0, angle));
            world.spawn_bullet(bullet(99, 50.0, 300.0, 0.0));
        }

        for _ in 0..120 {
            step(&mut world, &rules());
            for p in world.players() {
                assert!(p.health <= 100);
                assert!(p.health > 0, "dead players must be removed");
            }
        }
    }

    #[test]
    fn expired_bullets_are_pruned() {
        let mut world = WorldState::new();
        let mut old = bullet(1, 400.0, 300.0, PI / 2.0);
        old.speed = 0.0;
        old.lifetime = 1;
        world.spawn_bullet(old);
        let fresh = bullet(1, 400.0, 100.0, 0.0);
        let fresh_id = fresh.id;
        world.spawn_bullet(fresh);

        let report = step(&mut world, &rules());

        assert_eq!(report.expired, 1);
        assert_eq!(world.bullet_count(), 1);
        assert_eq!(world.bullets()[0].id, fresh_id);
    }

    #[test]
    fn bullets_leaving_the_map_are_pruned() {
        let mut world = WorldState::new();
        world.spawn_bullet(bullet(1, 795.0, 300.0, 0.0));
        world.spawn_bullet(bullet(1, 300.0, 5.0, -PI / 2.0));
        world.spawn_bullet(bullet(1, 400.0, 300.0, 0.0));

        let report = step(&mut world, &rules());

        assert_eq!(report.expired, 2);
        assert_eq!(world.bullet_count(), 1);
    }

    #[test]
    fn bullets_outlive_their_owner() {
        let mut world = WorldState::new();
        world.insert_player(player(1, 300.0, 100.0));
        world.spawn_bullet(bullet(2, 250.0, 100.0, 0.0));

        // Owner 2 never existed in the world, as after a disconnect
        let mut hit_after = None;
        for tick in 1..=10 {
            let report = step(&mut world, &rules());
            if let Some(hit) = hits(&report).first() {
                assert_eq!(hit.shooter_id, SessionId(2));
                hit_after = Some(tick);
                break;
            }
        }

        assert!(hit_after.is_some());
        assert_eq!(world.player(SessionId(1)).unwrap().health, 80);
    }

    #[test]
    fn empty_world_ticks_cleanly() {
        let mut world = WorldState::new();
        let report = step(&mut world, &rules());
        assert_eq!(report, TickReport { tick: 1, events: vec![], expired: 0 });
    }
}
