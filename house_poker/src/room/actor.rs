//! Room actor implementation with async message handling.
//!
//! The actor is the room's serialization point: commands and the timed
//! next-hand deal are applied one at a time from a single task.

use std::collections::HashMap;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, sleep_until},
};

use super::{
    config::RoomConfig,
    errors::RoomError,
    messages::{LeaveReply, RoomMessage, RoomNotification, RoomResponse, RoomSummary},
};
use crate::game::{
    ActionOutcome, Room, UserError,
    entities::{PlayerId, RoomCode, RoomStatus},
};

/// Room actor handle for sending messages
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    code: RoomCode,
}

impl RoomHandle {
    /// Create a new room handle
    pub fn new(sender: mpsc::Sender<RoomMessage>, code: RoomCode) -> Self {
        Self { sender, code }
    }

    /// Get room code
    pub fn code(&self) -> RoomCode {
        self.code
    }

    /// Send a message to the room
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::RoomClosed)
    }

    /// Whether the actor behind this handle has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Room actor managing a single poker room
pub struct RoomActor {
    /// Room code
    code: RoomCode,

    /// Registry-wide room configuration
    config: RoomConfig,

    /// Room state
    room: Room,

    /// Message inbox
    inbox: mpsc::Receiver<RoomMessage>,

    /// Subscribers for state change notifications
    subscribers: HashMap<PlayerId, mpsc::Sender<RoomNotification>>,

    /// When the next hand gets dealt, if one is scheduled
    next_hand_at: Option<Instant>,

    /// Last command that changed the room
    last_activity: Instant,

    /// Bumped by every command that changed the room
    revision: u64,

    /// Is room closed
    is_closed: bool,
}

impl RoomActor {
    /// Create a new room actor
    ///
    /// # Arguments
    ///
    /// * `room` - Room state, with its creator already seated
    /// * `config` - Room configuration
    ///
    /// # Returns
    ///
    /// * `(RoomActor, RoomHandle)` - Actor and handle for sending messages
    pub fn new(room: Room, config: RoomConfig) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let code = room.code();

        let actor = Self {
            code,
            config,
            room,
            inbox,
            subscribers: HashMap::new(),
            next_hand_at: None,
            last_activity: Instant::now(),
            revision: 0,
            is_closed: false,
        };

        (actor, RoomHandle::new(sender, code))
    }

    /// Run the room actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} open", self.code);

        loop {
            let deadline = self.next_hand_at;
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => self.handle_message(message),
                    // Every handle is gone.
                    None => break,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.next_hand_at = None;
                    self.deal_next_hand();
                }
            }

            if self.is_closed {
                break;
            }
        }

        self.broadcast(RoomNotification::Closed);
        log::info!("Room {} closed", self.code);
    }

    /// Handle a room message
    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::JoinRoom {
                player_id,
                name,
                response,
            } => {
                let result = self.room.seat_player(player_id, name);
                self.respond(result, response);
            }

            RoomMessage::LeaveRoom {
                player_id,
                response,
            } => {
                let result = self.room.remove_player(&player_id);
                self.subscribers.remove(&player_id);
                let result = self.after_outcome(result);
                let reply = self.settle(result);
                // Decided here so no join can slip in between the last
                // leave and the shutdown.
                let closed = reply.is_success() && self.room.seated_count() == 0;
                if closed {
                    log::info!("Room {}: last player left", self.code);
                    self.shut_down();
                }
                let _ = response.send(LeaveReply {
                    response: reply,
                    closed,
                });
            }

            RoomMessage::StartGame {
                player_id,
                response,
            } => {
                let result = self.room.start_game(&player_id);
                self.respond(result, response);
            }

            RoomMessage::TakeAction {
                player_id,
                action,
                response,
            } => {
                let result = self.room.take_action(&player_id, action);
                let result = self.after_outcome(result);
                self.respond(result, response);
            }

            RoomMessage::RequestBuyIn {
                player_id,
                response,
            } => {
                let result = self.room.request_buy_in(&player_id);
                self.respond(result, response);
            }

            RoomMessage::CastVote {
                player_id,
                approve,
                response,
            } => {
                let result = self.room.cast_vote(&player_id, approve);
                self.respond(result, response);
            }

            RoomMessage::GetView {
                player_id,
                response,
            } => {
                let _ = response.send(self.room.view_for(player_id.as_ref()));
            }

            RoomMessage::GetSummary { response } => {
                let _ = response.send(self.summary());
            }

            RoomMessage::Subscribe { player_id, sender } => {
                let view = self.room.view_for(Some(&player_id));
                if sender.try_send(RoomNotification::State(view)).is_ok() {
                    log::debug!("{} subscribed to room {}", player_id, self.code);
                    self.subscribers.insert(player_id, sender);
                }
            }

            RoomMessage::Unsubscribe { player_id } => {
                self.subscribers.remove(&player_id);
                log::debug!("{} unsubscribed from room {}", player_id, self.code);
            }

            RoomMessage::CloseIfUnchanged { revision, response } => {
                let unchanged = self.revision == revision;
                if unchanged {
                    self.shut_down();
                }
                let _ = response.send(unchanged);
            }

            RoomMessage::Close { response } => {
                self.shut_down();
                let _ = response.send(RoomResponse::Success);
            }
        }
    }

    /// Tell the room when something changed, then reply to the requester.
    fn respond<T>(
        &mut self,
        result: Result<T, UserError>,
        response: tokio::sync::oneshot::Sender<RoomResponse>,
    ) {
        let reply = self.settle(result);
        let _ = response.send(reply);
    }

    fn settle<T>(&mut self, result: Result<T, UserError>) -> RoomResponse {
        match &result {
            Ok(_) => {
                self.last_activity = Instant::now();
                self.revision += 1;
                self.publish();
            }
            Err(err) => log::debug!("Room {}: rejected: {err}", self.code),
        }
        RoomResponse::from(result)
    }

    fn shut_down(&mut self) {
        self.is_closed = true;
        self.next_hand_at = None;
    }

    /// Schedule the next deal after a finished hand, and give up on a hand
    /// that broke an invariant.
    fn after_outcome(
        &mut self,
        result: Result<ActionOutcome, UserError>,
    ) -> Result<ActionOutcome, UserError> {
        match result {
            Ok(ActionOutcome::HandEnded(hand)) => {
                self.next_hand_at = Some(Instant::now() + self.config.next_hand_delay);
                log::debug!(
                    "Room {}: next hand in {:?}",
                    self.code,
                    self.config.next_hand_delay
                );
                Ok(ActionOutcome::HandEnded(hand))
            }
            Err(err @ (UserError::DeckExhausted | UserError::InternalStateError)) => {
                log::error!("Room {}: {err}, abandoning hand", self.code);
                self.room.abandon_hand();
                self.next_hand_at = None;
                self.publish();
                Err(err)
            }
            other => other,
        }
    }

    fn deal_next_hand(&mut self) {
        if self.room.status() != RoomStatus::Finished {
            return;
        }
        match self.room.start_new_hand() {
            Ok(true) => log::debug!("Room {}: hand {} dealt", self.code, self.room.hand_number()),
            Ok(false) => log::info!("Room {}: back to waiting", self.code),
            Err(err) => {
                log::error!("Room {}: can't deal: {err}", self.code);
                self.room.abandon_hand();
            }
        }
        self.publish();
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code,
            status: self.room.status(),
            player_count: self.room.seated_count(),
            idle_for: self.last_activity.elapsed(),
            revision: self.revision,
        }
    }

    /// Push pending events and a personalised snapshot to every subscriber.
    fn publish(&mut self) {
        let events = self.room.drain_events();
        let room = &self.room;
        let code = self.code;
        self.subscribers.retain(|player_id, sender| {
            let notifications = events
                .iter()
                .cloned()
                .map(RoomNotification::Event)
                .chain(std::iter::once(RoomNotification::State(
                    room.view_for(Some(player_id)),
                )));
            for notification in notifications {
                match sender.try_send(notification) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        log::warn!(
                            "Subscriber {player_id} of room {code} channel full, dropping notification"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        log::debug!("Subscriber {player_id} of room {code} disconnected, removing");
                        return false;
                    }
                }
            }
            true
        });
    }

    fn broadcast(&mut self, notification: RoomNotification) {
        self.subscribers
            .retain(|_, sender| !matches!(sender.try_send(notification.clone()), Err(TrySendError::Closed(_))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        RoomSettings,
        entities::{Action, RoomView, Username},
    };
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn id(name: &str) -> PlayerId {
        PlayerId::from(name)
    }

    fn spawn_room(names: &[&str]) -> RoomHandle {
        let mut room = Room::with_seed(
            RoomCode::new(444_444).unwrap(),
            id(names[0]),
            Username::new(names[0]),
            RoomSettings::new(1000, 9, false),
            11,
        )
        .unwrap();
        for name in &names[1..] {
            room.seat_player(id(name), Username::new(name)).unwrap();
        }
        let (actor, handle) = RoomActor::new(room, RoomConfig::default());
        tokio::spawn(actor.run());
        handle
    }

    async fn command(
        handle: &RoomHandle,
        build: impl FnOnce(oneshot::Sender<RoomResponse>) -> RoomMessage,
    ) -> RoomResponse {
        let (tx, rx) = oneshot::channel();
        handle.send(build(tx)).await.unwrap();
        rx.await.unwrap()
    }

    async fn next_state(rx: &mut mpsc::Receiver<RoomNotification>) -> RoomView {
        loop {
            match rx.recv().await {
                Some(RoomNotification::State(view)) => return view,
                Some(RoomNotification::Event(_)) => continue,
                other => panic!("expected a state snapshot, got {other:?}"),
            }
        }
    }

    async fn view(handle: &RoomHandle) -> RoomView {
        let (tx, rx) = oneshot::channel();
        handle
            .send(RoomMessage::GetView {
                player_id: None,
                response: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_hand_dealt_after_delay() {
        let handle = spawn_room(&["a", "b"]);
        let response = command(&handle, |tx| RoomMessage::StartGame {
            player_id: id("a"),
            response: tx,
        })
        .await;
        assert!(response.is_success());

        let response = command(&handle, |tx| RoomMessage::TakeAction {
            player_id: id("a"),
            action: Action::Fold,
            response: tx,
        })
        .await;
        assert!(response.is_success());
        let finished = view(&handle).await;
        assert_eq!(finished.status, RoomStatus::Finished);
        assert_eq!(finished.winner_message.as_deref(), Some("b wins!"));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(view(&handle).await.hand_number, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let next = view(&handle).await;
        assert_eq!(next.status, RoomStatus::Playing);
        assert_eq!(next.hand_number, 2);
    }

    #[tokio::test]
    async fn test_rejection_reported_to_requester() {
        let handle = spawn_room(&["a", "b"]);
        let response = command(&handle, |tx| RoomMessage::StartGame {
            player_id: id("b"),
            response: tx,
        })
        .await;
        assert_eq!(response, RoomResponse::Rejected(UserError::NotHost));
        assert_eq!(response.error_message().as_deref(), Some("only the host can start the game"));
        assert_eq!(view(&handle).await.status, RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn test_subscribers_get_personal_views() {
        let handle = spawn_room(&["a", "b"]);
        let (a_tx, mut a_rx) = mpsc::channel(16);
        let (b_tx, mut b_rx) = mpsc::channel(16);
        handle
            .send(RoomMessage::Subscribe {
                player_id: id("a"),
                sender: a_tx,
            })
            .await
            .unwrap();
        handle
            .send(RoomMessage::Subscribe {
                player_id: id("b"),
                sender: b_tx,
            })
            .await
            .unwrap();
        assert_eq!(next_state(&mut a_rx).await.status, RoomStatus::Waiting);
        assert_eq!(next_state(&mut b_rx).await.status, RoomStatus::Waiting);

        command(&handle, |tx| RoomMessage::StartGame {
            player_id: id("a"),
            response: tx,
        })
        .await;

        let a_view = next_state(&mut a_rx).await;
        assert_eq!(a_view.status, RoomStatus::Playing);
        let own = a_view.players.iter().find(|p| p.id == id("a")).unwrap();
        let other = a_view.players.iter().find(|p| p.id == id("b")).unwrap();
        assert_eq!(own.cards.len(), 2);
        assert!(other.cards.is_empty());

        let b_view = next_state(&mut b_rx).await;
        let own = b_view.players.iter().find(|p| p.id == id("b")).unwrap();
        assert_eq!(own.cards.len(), 2);
    }

    #[tokio::test]
    async fn test_last_leave_stops_room_before_queued_join() {
        let handle = spawn_room(&["a"]);
        let (leave_tx, leave_rx) = oneshot::channel();
        let (join_tx, join_rx) = oneshot::channel();
        handle
            .send(RoomMessage::LeaveRoom {
                player_id: id("a"),
                response: leave_tx,
            })
            .await
            .unwrap();
        // Queued behind the leave; the room must never seat it.
        let _ = handle
            .send(RoomMessage::JoinRoom {
                player_id: id("b"),
                name: Username::new("b"),
                response: join_tx,
            })
            .await;

        let reply = leave_rx.await.unwrap();
        assert_eq!(reply.response, RoomResponse::Success);
        assert!(reply.closed);
        assert!(join_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_leave_with_others_seated_keeps_room_open() {
        let handle = spawn_room(&["a", "b"]);
        let (tx, rx) = oneshot::channel();
        handle
            .send(RoomMessage::LeaveRoom {
                player_id: id("a"),
                response: tx,
            })
            .await
            .unwrap();
        let reply = rx.await.unwrap();
        assert!(reply.response.is_success());
        assert!(!reply.closed);
        assert_eq!(view(&handle).await.host, id("b"));
    }

    #[tokio::test]
    async fn test_close_if_unchanged_loses_to_join() {
        let handle = spawn_room(&["a"]);
        let (tx, rx) = oneshot::channel();
        handle
            .send(RoomMessage::GetSummary { response: tx })
            .await
            .unwrap();
        let stale = rx.await.unwrap();

        let response = command(&handle, |tx| RoomMessage::JoinRoom {
            player_id: id("b"),
            name: Username::new("b"),
            response: tx,
        })
        .await;
        assert!(response.is_success());

        let (tx, rx) = oneshot::channel();
        handle
            .send(RoomMessage::CloseIfUnchanged {
                revision: stale.revision,
                response: tx,
            })
            .await
            .unwrap();
        assert!(!rx.await.unwrap());
        assert_eq!(view(&handle).await.players.len(), 2);

        let (tx, rx) = oneshot::channel();
        handle
            .send(RoomMessage::CloseIfUnchanged {
                revision: stale.revision + 1,
                response: tx,
            })
            .await
            .unwrap();
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_close_notifies_and_stops() {
        let handle = spawn_room(&["a"]);
        let (tx, mut rx) = mpsc::channel(16);
        handle
            .send(RoomMessage::Subscribe {
                player_id: id("a"),
                sender: tx,
            })
            .await
            .unwrap();
        let response = command(&handle, |tx| RoomMessage::Close { response: tx }).await;
        assert!(response.is_success());

        assert!(matches!(rx.recv().await, Some(RoomNotification::State(_))));
        assert!(matches!(rx.recv().await, Some(RoomNotification::Closed)));
        assert_eq!(rx.recv().await.map(|_| ()), None);

        let (tx, _rx) = oneshot::channel();
        let send = handle
            .send(RoomMessage::GetSummary { response: tx })
            .await;
        assert_eq!(send, Err(RoomError::RoomClosed));
    }
}
