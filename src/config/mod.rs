//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::validation::ValidationMode;
use crate::util::rate_limit::INPUT_RATE_LIMIT;

/// Port used when neither `PORT` nor `SERVER_ADDR` is set
pub const DEFAULT_PORT: u16 = 3000;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,
    /// How movement and shot intents are checked before they touch the world
    pub validation: ValidationMode,
    /// Inbound messages per second allowed on one connection
    pub input_rate_limit: u32,
    /// Fixed seed for spawn positions (random when absent)
    pub spawn_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| format!("0.0.0.0:{}", DEFAULT_PORT)),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let validation = match lookup("MOVEMENT_VALIDATION") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::invalid("MOVEMENT_VALIDATION", &value))?,
            None => ValidationMode::default(),
        };

        let input_rate_limit = match lookup("INPUT_RATE_LIMIT") {
            Some(value) => value
                .trim()
                .parse()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| ConfigError::invalid("INPUT_RATE_LIMIT", &value))?,
            None => INPUT_RATE_LIMIT,
        };

        let spawn_seed = match lookup("SPAWN_SEED") {
            Some(value) => Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::invalid("SPAWN_SEED", &value))?,
            ),
            None => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr))?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origins,
            validation,
            input_rate_limit,
            spawn_seed,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str) -> Self {
        Self::InvalidValue {
            key,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_listen_on_port_3000() {
        let config = assert_ok!(load(&[]));
        assert_eq!(config.server_addr.port(), DEFAULT_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.validation, ValidationMode::Clamp);
        assert_eq!(config.input_rate_limit, INPUT_RATE_LIMIT);
        assert!(config.client_origins.is_empty());
        assert!(config.spawn_seed.is_none());
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = assert_ok!(load(&[("PORT", "4100"), ("SERVER_ADDR", "127.0.0.1:9000")]));
        assert_eq!(config.server_addr.port(), 4100);

        let config = assert_ok!(load(&[("SERVER_ADDR", "127.0.0.1:9000")]));
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = assert_ok!(load(&[(
            "CLIENT_ORIGIN",
            "http://localhost:3000, https://arena.example ,"
        )]));
        assert_eq!(
            config.client_origins,
            vec!["http://localhost:3000", "https://arena.example"]
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_err!(load(&[("PORT", "not-a-port")]));
        assert_err!(load(&[("MOVEMENT_VALIDATION", "paranoid")]));
        assert_err!(load(&[("INPUT_RATE_LIMIT", "0")]));
        assert_err!(load(&[("SPAWN_SEED", "-1")]));
    }

    #[test]
    fn trust_mode_and_seed_are_read() {
        let config = assert_ok!(load(&[("MOVEMENT_VALIDATION", "trust"), ("SPAWN_SEED", "42")]));
        assert_eq!(config.validation, ValidationMode::Trust);
        assert_eq!(config.spawn_seed, Some(42));
    }
}
