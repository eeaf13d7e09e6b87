//! Room actor message types.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::game::{
    GameEvent, UserError,
    entities::{Action, PlayerId, RoomCode, RoomStatus, RoomView, Username},
};

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Take a seat with the room's starting stack
    JoinRoom {
        player_id: PlayerId,
        name: Username,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Leave the room (folds first if a hand is running). The room shuts
    /// itself down when the last player leaves.
    LeaveRoom {
        player_id: PlayerId,
        response: oneshot::Sender<LeaveReply>,
    },

    /// Host starts the first hand
    StartGame {
        player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Player action (fold, check, call, raise)
    TakeAction {
        player_id: PlayerId,
        action: Action,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Busted player asks for a fresh stack
    RequestBuyIn {
        player_id: PlayerId,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Ballot on the running buy-in vote
    CastVote {
        player_id: PlayerId,
        approve: bool,
        response: oneshot::Sender<RoomResponse>,
    },

    /// Snapshot as seen by a player (or by nobody in particular)
    GetView {
        player_id: Option<PlayerId>,
        response: oneshot::Sender<RoomView>,
    },

    /// Occupancy and idle time, for the reaper
    GetSummary {
        response: oneshot::Sender<RoomSummary>,
    },

    /// Subscribe to state change notifications
    Subscribe {
        player_id: PlayerId,
        sender: mpsc::Sender<RoomNotification>,
    },

    /// Unsubscribe from state change notifications
    Unsubscribe { player_id: PlayerId },

    /// Stop the actor unless a command changed the room after `revision`
    CloseIfUnchanged {
        revision: u64,
        response: oneshot::Sender<bool>,
    },

    /// Stop the actor
    Close {
        response: oneshot::Sender<RoomResponse>,
    },
}

/// Pushed to subscribers after every state change
#[derive(Debug, Clone)]
pub enum RoomNotification {
    /// Fresh snapshot, personalised for the subscriber
    State(RoomView),
    /// Something worth telling the room about (votes, results, seats)
    Event(GameEvent),
    /// The room shut down
    Closed,
}

/// Response from room operations
#[derive(Debug, Clone, PartialEq)]
pub enum RoomResponse {
    /// Operation succeeded
    Success,

    /// The room refused the command; nothing changed
    Rejected(UserError),
}

impl RoomResponse {
    /// Check if response is success
    pub fn is_success(&self) -> bool {
        matches!(self, RoomResponse::Success)
    }

    /// Get error message if response is error
    pub fn error_message(&self) -> Option<String> {
        match self {
            RoomResponse::Success => None,
            RoomResponse::Rejected(err) => Some(err.to_string()),
        }
    }
}

impl<T> From<Result<T, UserError>> for RoomResponse {
    fn from(value: Result<T, UserError>) -> Self {
        match value {
            Ok(_) => RoomResponse::Success,
            Err(err) => RoomResponse::Rejected(err),
        }
    }
}

/// Reply to a leave
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveReply {
    pub response: RoomResponse,
    /// Nobody is left and the room stopped
    pub closed: bool,
}

/// Room occupancy summary
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    /// Room code
    pub code: RoomCode,

    /// Lifecycle status
    pub status: RoomStatus,

    /// Seated players not queued to leave
    pub player_count: usize,

    /// Time since the last command that changed the room
    pub idle_for: Duration,

    /// Count of commands that changed the room
    pub revision: u64,
}
