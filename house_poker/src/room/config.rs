//! Room configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    RoomSettings,
    constants::{DEFAULT_MAX_PLAYERS, MAX_PLAYERS, MAX_STARTING_STACK},
    entities::{Chips, DEFAULT_STARTING_STACK},
};

/// Registry-wide defaults applied to every room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Stack used when the creator doesn't pick one (default: 1000)
    pub default_starting_stack: Chips,

    /// Seat cap per room (default: 10)
    pub max_players: usize,

    /// Pause between a hand's result and the next deal (default: 8s)
    pub next_hand_delay: Duration,

    /// Whether players may join once the first hand was dealt
    pub allow_join_in_progress: bool,

    /// Room actor inbox size
    pub inbox_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_starting_stack: DEFAULT_STARTING_STACK,
            max_players: DEFAULT_MAX_PLAYERS,
            next_hand_delay: Duration::from_secs(8),
            allow_join_in_progress: false,
            inbox_capacity: 100,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_starting_stack == 0 || self.default_starting_stack > MAX_STARTING_STACK {
            return Err(format!(
                "Default starting stack must be between 1 and {MAX_STARTING_STACK}"
            ));
        }

        if self.max_players < 2 || self.max_players > MAX_PLAYERS {
            return Err(format!("Max players must be between 2 and {MAX_PLAYERS}"));
        }

        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Settings for a new room, using the default stack unless one is given.
    pub fn room_settings(&self, starting_stack: Option<Chips>) -> RoomSettings {
        RoomSettings::new(
            starting_stack.unwrap_or(self.default_starting_stack),
            self.max_players,
            self.allow_join_in_progress,
        )
    }
}
