//! Room registry error types.

use thiserror::Error;

use crate::game::{UserError, entities::RoomCode};

/// Registry and actor plumbing errors
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RoomError {
    /// No room is registered under the code
    #[error("Room not found: {0}")]
    RoomNotFound(RoomCode),

    /// The room's actor stopped before answering
    #[error("Room is closed")]
    RoomClosed,

    /// Every code tried was already taken
    #[error("No free room code after {0} attempts")]
    CodeSpaceExhausted(usize),

    /// Room configuration failed validation
    #[error("Invalid room configuration: {0}")]
    InvalidConfig(String),

    /// The room refused to create with these settings
    #[error(transparent)]
    Rejected(#[from] UserError),
}

impl RoomError {
    /// Message safe to hand back to a client.
    pub fn client_message(&self) -> String {
        match self {
            RoomError::RoomNotFound(_) => "Room not found".to_string(),
            RoomError::CodeSpaceExhausted(_) | RoomError::InvalidConfig(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}
