//! Trust boundary for client-reported physical state
//!
//! Movement and shot intents carry positions chosen by the client. Everything the
//! session manager accepts from a client passes through [`IntentValidator`] first.

use std::str::FromStr;

use super::physics::PhysicsSystem;
use super::ArenaRules;

/// How much of the client's physical state is taken at face value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Accept positions verbatim
    Trust,
    /// Clamp positions onto the map and normalize angles
    #[default]
    Clamp,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(Self::Trust),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("unknown validation mode: {other}")),
        }
    }
}

/// A movement intent that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidMove {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// A shot intent that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidShot {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

/// Rejected client intents
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntentError {
    #[error("Non-finite {field} in client intent")]
    NonFinite { field: &'static str },

    #[error("Negative bullet speed {0}")]
    NegativeSpeed(f32),
}

#[derive(Debug, Clone, Copy)]
pub struct IntentValidator {
    mode: ValidationMode,
    rules: ArenaRules,
}

impl IntentValidator {
    pub fn new(mode: ValidationMode, rules: ArenaRules) -> Self {
        Self { mode, rules }
    }

    pub fn validate_move(&self, x: f32, y: f32, angle: f32) -> Result<ValidMove, IntentError> {
        finite("x", x)?;
        finite("y", y)?;
        finite("angle", angle)?;

        Ok(match self.mode {
            ValidationMode::Trust => ValidMove { x, y, angle },
            ValidationMode::Clamp => {
                let (x, y) = PhysicsSystem::clamp_player_position(x, y, &self.rules);
                ValidMove {
                    x,
                    y,
                    angle: PhysicsSystem::normalize_angle(angle),
                }
            }
        })
    }

    pub fn validate_shot(
        &self,
        x: f32,
        y: f32,
        angle: f32,
        speed: Option<f32>,
    ) -> Result<ValidShot, IntentError> {
        finite("x", x)?;
        finite("y", y)?;
        finite("angle", angle)?;
        if let Some(speed) = speed {
            finite("speed", speed)?;
        }

        Ok(match self.mode {
            ValidationMode::Trust => ValidShot { x, y, angle },
            ValidationMode::Clamp => {
                if let Some(speed) = speed.filter(|s| *s < 0.0) {
                    return Err(IntentError::NegativeSpeed(speed));
                }
                let (x, y) = PhysicsSystem::clamp_to_map(x, y, &self.rules);
                ValidShot {
                    x,
                    y,
                    angle: PhysicsSystem::normalize_angle(angle),
                }
            }
        })
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), IntentError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(IntentError::NonFinite { field })
    }
}
