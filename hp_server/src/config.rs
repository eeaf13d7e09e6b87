//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use house_poker::{
    MAX_PLAYERS, RoomConfig,
    constants::MAX_STARTING_STACK,
    entities::{Chips, DEFAULT_STARTING_STACK},
    room::ReaperConfig,
};
use std::{net::SocketAddr, str::FromStr, time::Duration};

const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Defaults for every room
    pub room: RoomConfig,
    /// Idle room reaping
    pub reaper: ReaperConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        Self::from_lookup(bind_override, |key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(bind_override: Option<SocketAddr>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_or(&lookup, "SERVER_BIND", default_bind()?)?,
        };

        let defaults = RoomConfig::default();
        let room = RoomConfig {
            default_starting_stack: parse_env_or(
                &lookup,
                "DEFAULT_START_STACK",
                DEFAULT_STARTING_STACK,
            )?,
            max_players: parse_env_or(&lookup, "MAX_PLAYERS_PER_ROOM", defaults.max_players)?,
            next_hand_delay: Duration::from_secs(parse_env_or(
                &lookup,
                "NEXT_HAND_DELAY_SECS",
                defaults.next_hand_delay.as_secs(),
            )?),
            allow_join_in_progress: parse_env_or(
                &lookup,
                "ALLOW_JOIN_IN_PROGRESS",
                defaults.allow_join_in_progress,
            )?,
            ..defaults
        };

        let reaper_defaults = ReaperConfig::default();
        let reaper = ReaperConfig {
            interval: Duration::from_secs(parse_env_or(
                &lookup,
                "REAPER_INTERVAL_SECS",
                reaper_defaults.interval.as_secs(),
            )?),
            idle_threshold: Duration::from_secs(parse_env_or(
                &lookup,
                "ROOM_IDLE_TIMEOUT_SECS",
                reaper_defaults.idle_threshold.as_secs(),
            )?),
        };

        Ok(ServerConfig { bind, room, reaper })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room.default_starting_stack == 0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_START_STACK".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.room.default_starting_stack > MAX_STARTING_STACK {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_START_STACK".to_string(),
                reason: format!("Must be at most {MAX_STARTING_STACK}"),
            });
        }

        if self.room.max_players < 2 {
            return Err(ConfigError::Invalid {
                var: "MAX_PLAYERS_PER_ROOM".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.room.max_players > MAX_PLAYERS {
            return Err(ConfigError::Invalid {
                var: "MAX_PLAYERS_PER_ROOM".to_string(),
                reason: format!("Must be at most {MAX_PLAYERS} (max players with 52-card deck)"),
            });
        }

        if self.reaper.interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "REAPER_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.reaper.idle_threshold.is_zero() {
            return Err(ConfigError::Invalid {
                var: "ROOM_IDLE_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Starting stack rooms get when the creator doesn't pick one.
    pub fn default_starting_stack(&self) -> Chips {
        self.room.default_starting_stack
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("Default {DEFAULT_BIND} is not a socket address"),
    })
}

/// Parse a variable, falling back to `default` when it isn't set. A set
/// but malformed value is an error rather than a silent default.
fn parse_env_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Can't parse {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(None, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind, "127.0.0.1:6969".parse::<SocketAddr>().unwrap());
        assert_eq!(config.default_starting_stack(), 1000);
        assert_eq!(config.room.next_hand_delay, Duration::from_secs(8));
        assert!(!config.room.allow_join_in_progress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = load(&[
            ("SERVER_BIND", "0.0.0.0:8080"),
            ("DEFAULT_START_STACK", "2500"),
            ("MAX_PLAYERS_PER_ROOM", "6"),
            ("NEXT_HAND_DELAY_SECS", "3"),
            ("ALLOW_JOIN_IN_PROGRESS", "true"),
            ("REAPER_INTERVAL_SECS", "15"),
            ("ROOM_IDLE_TIMEOUT_SECS", "600"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.room.default_starting_stack, 2500);
        assert_eq!(config.room.max_players, 6);
        assert_eq!(config.room.next_hand_delay, Duration::from_secs(3));
        assert!(config.room.allow_join_in_progress);
        assert_eq!(config.reaper.interval, Duration::from_secs(15));
        assert_eq!(config.reaper.idle_threshold, Duration::from_secs(600));
    }

    #[test]
    fn test_cli_bind_wins() {
        let bind: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let err =
            ServerConfig::from_lookup(Some(bind), |_| Some("0.0.0.0:1".to_string())).unwrap_err();
        // Every other variable also reads "0.0.0.0:1" here, which doesn't parse as a stack.
        assert!(err.to_string().contains("DEFAULT_START_STACK"));

        let config = ServerConfig::from_lookup(Some(bind), |_| None).unwrap();
        assert_eq!(config.bind, bind);
    }

    #[test]
    fn test_malformed_value_is_error() {
        let err = load(&[("DEFAULT_START_STACK", "lots")]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DEFAULT_START_STACK"));
        assert!(msg.contains("lots"));
    }

    #[test]
    fn test_config_validation_player_bounds() {
        let config = load(&[("MAX_PLAYERS_PER_ROOM", "1")]).unwrap();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Invalid { var, .. } if var == "MAX_PLAYERS_PER_ROOM"
        ));

        let config = load(&[("MAX_PLAYERS_PER_ROOM", "24")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_stack() {
        let config = load(&[("DEFAULT_START_STACK", "0")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_config_validation_stack_too_large() {
        let config = load(&[("DEFAULT_START_STACK", "3000000000")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { var, .. } if var == "DEFAULT_START_STACK"
        ));
    }
}
