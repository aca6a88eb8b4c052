//! Combat system - bullets, damage, hit detection

use uuid::Uuid;

use crate::ws::protocol::{BulletInfo, SessionId};

use super::physics::PhysicsSystem;
use super::ArenaRules;

/// Active bullet in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    /// Stable identity, assigned at fire time
    pub id: Uuid,
    /// May refer to a player that has since left or died
    pub owner_id: SessionId,
    pub x: f32,
    pub y: f32,
    /// Direction of travel, fixed for the bullet's life
    pub angle: f32,
    /// Distance per tick
    pub speed: f32,
    /// Ticks remaining
    pub lifetime: u32,
}

impl Bullet {
    /// Create a new bullet at its owner's reported position
    pub fn new(owner_id: SessionId, x: f32, y: f32, angle: f32, rules: &ArenaRules) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            x,
            y,
            angle,
            speed: rules.bullet_speed,
            lifetime: rules.bullet_lifetime,
        }
    }

    /// Advance one tick along the fixed heading
    pub fn update(&mut self) {
        self.x += self.speed * self.angle.cos();
        self.y += self.speed * self.angle.sin();
        self.lifetime = self.lifetime.saturating_sub(1);
    }

    /// Strict overlap test against a player circle
    pub fn check_hit(&self, target_x: f32, target_y: f32, rules: &ArenaRules) -> bool {
        PhysicsSystem::circles_overlap(
            self.x,
            self.y,
            rules.bullet_radius,
            target_x,
            target_y,
            rules.player_radius,
        )
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime == 0
    }

    pub fn info(&self) -> BulletInfo {
        BulletInfo {
            id: self.id,
            x: self.x,
            y: self.y,
            angle: self.angle,
            speed: self.speed,
            owner_id: self.owner_id,
            lifetime: self.lifetime,
        }
    }
}

/// Combat rules shared by the simulation
pub struct CombatSystem;

impl CombatSystem {
    /// Apply damage to health, returns (new_health, is_dead)
    pub fn apply_damage(current_health: u32, damage: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, new_health == 0)
    }
}

/// Hit result from collision resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub bullet_id: Uuid,
    pub shooter_id: SessionId,
    pub target_id: SessionId,
    /// Target health after the hit
    pub health: u32,
    pub target_killed: bool,
}
