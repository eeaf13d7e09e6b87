//! WebSocket handler for the game protocol.
//!
//! Every connection is one player. The server hands it a random identity on
//! connect; that identity is what the room engine seats, so a player can't
//! act for anyone else.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. Server assigns a UUID identity and spawns a send task
//! 3. Client creates or joins a room; the connection subscribes to it
//! 4. Every room change pushes a `game_state` snapshot, personalised so only
//!    the player's own hole cards are visible
//! 5. On disconnect the player leaves their room
//!
//! # Client Messages
//!
//! ```javascript
//! ws.send(JSON.stringify({ type: "create_room", name: "alice", start_stack: 500 }));
//! ws.send(JSON.stringify({ type: "join_room", name: "bob", room_code: "123456" }));
//! ws.send(JSON.stringify({ type: "start_game" }));
//! ws.send(JSON.stringify({ type: "action", action: "raise", amount: 100 }));
//! ws.send(JSON.stringify({ type: "request_buy_in" }));
//! ws.send(JSON.stringify({ type: "cast_vote", approve: true }));
//! ws.send(JSON.stringify({ type: "leave_room" }));
//! ```
//!
//! # Server Messages
//!
//! - `room_created` / `joined_room`: `{room_code, user_id}`
//! - `game_state`: the room snapshot
//! - `event`: `{message}` for joins, leaves, votes and hand results
//! - `error`: `{message}` when a command was refused; nothing changed

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use house_poker::{
    RoomError,
    entities::{Action, Chips, InvalidRoomCode, PlayerId, RoomCode, RoomView, Username},
    room::{RoomNotification, RoomResponse},
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::AppState;

/// Per-connection channel sizes
const OUTBOUND_CAPACITY: usize = 32;
const NOTIFICATION_CAPACITY: usize = 64;

/// Client messages received via WebSocket
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room and take its first seat as host
    CreateRoom {
        name: Username,
        #[serde(default)]
        start_stack: Option<Chips>,
    },
    /// Take a seat in an existing room
    JoinRoom { name: Username, room_code: CodeInput },
    /// Host deals the first hand
    StartGame,
    /// Betting action; `amount` is only read for raises
    Action {
        action: ActionKind,
        #[serde(default)]
        amount: Option<Chips>,
    },
    /// Ask the table for a fresh stack
    RequestBuyIn,
    /// Ballot on the open buy-in vote
    CastVote { approve: bool },
    /// Leave the current room
    LeaveRoom,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
}

/// Room codes arrive as numbers from some clients and strings from others.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum CodeInput {
    Number(u32),
    Text(String),
}

impl CodeInput {
    pub fn parse(&self) -> Result<RoomCode, InvalidRoomCode> {
        match self {
            CodeInput::Number(value) => RoomCode::new(*value),
            CodeInput::Text(text) => text.parse(),
        }
    }
}

/// Messages sent to the client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        room_code: RoomCode,
        user_id: PlayerId,
    },
    JoinedRoom {
        room_code: RoomCode,
        user_id: PlayerId,
    },
    GameState(RoomView),
    Event {
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

impl From<RoomNotification> for ServerMessage {
    fn from(notification: RoomNotification) -> Self {
        match notification {
            RoomNotification::State(view) => ServerMessage::GameState(view),
            RoomNotification::Event(event) => ServerMessage::Event {
                message: event.to_string(),
            },
            RoomNotification::Closed => ServerMessage::Event {
                message: "room closed".to_string(),
            },
        }
    }
}

/// What one connection knows about itself
struct Session {
    player_id: PlayerId,
    room: Option<RoomCode>,
}

/// Upgrade HTTP connection to WebSocket for the game protocol.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
///
/// The send task is the only writer to the socket. Direct replies go
/// through `outbound` and are preferred over queued room notifications, so
/// a `room_created` always precedes the first snapshot of that room.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session {
        player_id: PlayerId::new(Uuid::new_v4().to_string()),
        room: None,
    };

    info!(player_id = %session.player_id, "WebSocket connected");

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
    let (notification_tx, mut notification_rx) =
        mpsc::channel::<RoomNotification>(NOTIFICATION_CAPACITY);

    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                biased;
                Some(message) = outbound_rx.recv() => message,
                Some(notification) = notification_rx.recv() => ServerMessage::from(notification),
                else => break,
            };

            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!(player_id = %session.player_id, "Received message: {}", text.as_str());

                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(client_msg) => {
                        handle_client_message(
                            client_msg,
                            &mut session,
                            &state,
                            &outbound_tx,
                            &notification_tx,
                        )
                        .await;
                    }
                    Err(e) => {
                        warn!(player_id = %session.player_id, error = %e, "Failed to parse client message");
                        let _ = outbound_tx
                            .send(ServerMessage::error("Invalid message format"))
                            .await;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!(player_id = %session.player_id, "WebSocket closed");
                break;
            }
            Err(e) => {
                error!(player_id = %session.player_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    send_task.abort();

    // Disconnecting counts as leaving.
    leave_current_room(&mut session, &state).await;

    info!(player_id = %session.player_id, "WebSocket disconnected");
}

/// Process one client command, replying through `outbound` where the
/// command warrants a direct answer. Successful game commands have no
/// direct reply: the room's next snapshot is the acknowledgement.
async fn handle_client_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &AppState,
    outbound: &mpsc::Sender<ServerMessage>,
    notifications: &mpsc::Sender<RoomNotification>,
) {
    let manager = &state.room_manager;
    let player_id = session.player_id.clone();

    let reply = match msg {
        ClientMessage::CreateRoom { name, start_stack } => {
            leave_current_room(session, state).await;
            match manager.create_room(player_id.clone(), name, start_stack).await {
                Ok(room_code) => {
                    info!(%player_id, %room_code, "Room created");
                    let _ = outbound
                        .send(ServerMessage::RoomCreated {
                            room_code,
                            user_id: player_id.clone(),
                        })
                        .await;
                    enter_room(session, state, room_code, notifications).await
                }
                Err(e) => Some(room_error(e)),
            }
        }

        ClientMessage::JoinRoom { name, room_code } => {
            let room_code = match room_code.parse() {
                Ok(code) => code,
                Err(e) => {
                    let _ = outbound.send(ServerMessage::error(e.to_string())).await;
                    return;
                }
            };
            if session.room == Some(room_code) {
                Some(ServerMessage::error("already in this room"))
            } else {
                leave_current_room(session, state).await;
                match manager.join_room(room_code, player_id.clone(), name).await {
                    Ok(RoomResponse::Success) => {
                        info!(%player_id, %room_code, "Joined room");
                        let _ = outbound
                            .send(ServerMessage::JoinedRoom {
                                room_code,
                                user_id: player_id.clone(),
                            })
                            .await;
                        enter_room(session, state, room_code, notifications).await
                    }
                    Ok(response) => rejected(response),
                    Err(e) => Some(room_error(e)),
                }
            }
        }

        ClientMessage::LeaveRoom => match session.room {
            Some(room_code) => {
                leave_current_room(session, state).await;
                Some(ServerMessage::Event {
                    message: format!("left room {room_code}"),
                })
            }
            None => Some(ServerMessage::error("not in a room")),
        },

        ClientMessage::StartGame => {
            in_room(session, |code| manager.start_game(code, player_id)).await
        }

        ClientMessage::Action { action, amount } => {
            let action = match (action, amount) {
                (ActionKind::Fold, _) => Action::Fold,
                (ActionKind::Check, _) => Action::Check,
                (ActionKind::Call, _) => Action::Call,
                (ActionKind::Raise, Some(amount)) => Action::Raise(amount),
                (ActionKind::Raise, None) => {
                    let _ = outbound
                        .send(ServerMessage::error("raise needs an amount"))
                        .await;
                    return;
                }
            };
            in_room(session, |code| manager.take_action(code, player_id, action)).await
        }

        ClientMessage::RequestBuyIn => {
            in_room(session, |code| manager.request_buy_in(code, player_id)).await
        }

        ClientMessage::CastVote { approve } => {
            in_room(session, |code| manager.cast_vote(code, player_id, approve)).await
        }
    };

    if let Some(reply) = reply {
        let _ = outbound.send(reply).await;
    }
}

/// Run a room command for the session's room, turning refusals into an error reply.
async fn in_room<F, Fut>(session: &Session, command: F) -> Option<ServerMessage>
where
    F: FnOnce(RoomCode) -> Fut,
    Fut: Future<Output = Result<RoomResponse, RoomError>>,
{
    let Some(code) = session.room else {
        return Some(ServerMessage::error("not in a room"));
    };
    match command(code).await {
        Ok(response) => rejected(response),
        Err(e) => Some(room_error(e)),
    }
}

fn rejected(response: RoomResponse) -> Option<ServerMessage> {
    response.error_message().map(ServerMessage::error)
}

fn room_error(e: RoomError) -> ServerMessage {
    if matches!(e, RoomError::CodeSpaceExhausted(_) | RoomError::InvalidConfig(_)) {
        error!(error = %e, "Room registry failure");
    }
    ServerMessage::error(e.client_message())
}

/// Subscribe the connection to `room_code` and remember it.
async fn enter_room(
    session: &mut Session,
    state: &AppState,
    room_code: RoomCode,
    notifications: &mpsc::Sender<RoomNotification>,
) -> Option<ServerMessage> {
    session.room = Some(room_code);
    match state
        .room_manager
        .subscribe(room_code, session.player_id.clone(), notifications.clone())
        .await
    {
        Ok(()) => None,
        Err(e) => {
            warn!(player_id = %session.player_id, %room_code, error = %e, "Failed to subscribe");
            Some(room_error(e))
        }
    }
}

/// Leave whatever room the session is in. A room that already closed is fine.
async fn leave_current_room(session: &mut Session, state: &AppState) {
    let Some(room_code) = session.room.take() else {
        return;
    };
    let manager = &state.room_manager;
    let _ = manager
        .unsubscribe(room_code, session.player_id.clone())
        .await;
    match manager
        .leave_room(room_code, session.player_id.clone())
        .await
    {
        Ok(RoomResponse::Success) => {
            info!(player_id = %session.player_id, %room_code, "Left room");
        }
        Ok(RoomResponse::Rejected(e)) => {
            debug!(player_id = %session.player_id, %room_code, error = %e, "Leave refused");
        }
        Err(e) => {
            debug!(player_id = %session.player_id, %room_code, error = %e, "Room already gone");
        }
    }
}
