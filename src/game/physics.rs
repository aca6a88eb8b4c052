//! Arena geometry: bounds, spawn placement, circle overlap

use rand::Rng;

use super::ArenaRules;

/// Physics helpers for positions inside the arena
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Check whether two circles overlap (touching does not count)
    pub fn circles_overlap(x1: f32, y1: f32, radius1: f32, x2: f32, y2: f32, radius2: f32) -> bool {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let combined_radius = radius1 + radius2;
        dx * dx + dy * dy < combined_radius * combined_radius
    }

    /// Check if a point lies within the map rectangle, edges included
    pub fn is_inside_map(x: f32, y: f32, rules: &ArenaRules) -> bool {
        (0.0..=rules.map_width).contains(&x) && (0.0..=rules.map_height).contains(&y)
    }

    /// Clamp a player centre so the whole body stays on the map
    pub fn clamp_player_position(x: f32, y: f32, rules: &ArenaRules) -> (f32, f32) {
        let r = rules.player_radius;
        (
            x.clamp(r, (rules.map_width - r).max(r)),
            y.clamp(r, (rules.map_height - r).max(r)),
        )
    }

    /// Clamp a point onto the map rectangle
    pub fn clamp_to_map(x: f32, y: f32, rules: &ArenaRules) -> (f32, f32) {
        (x.clamp(0.0, rules.map_width), y.clamp(0.0, rules.map_height))
    }

    /// Normalize an angle to 0..2π
    pub fn normalize_angle(angle: f32) -> f32 {
        angle.rem_euclid(std::f32::consts::TAU)
    }

    /// Uniformly random player position with the whole body on the map
    pub fn random_spawn<R: Rng + ?Sized>(rng: &mut R, rules: &ArenaRules) -> (f32, f32) {
        let r = rules.player_radius;
        let x = rng.gen_range(r..=(rules.map_width - r).max(r));
        let y = rng.gen_range(r..=(rules.map_height - r).max(r));
        (x, y)
    }
}
