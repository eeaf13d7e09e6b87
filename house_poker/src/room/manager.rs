//! Room manager for spawning and looking up room actors by code.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc, oneshot};

use super::{
    actor::{RoomActor, RoomHandle},
    codes::generate_unique_code,
    config::RoomConfig,
    errors::RoomError,
    messages::{RoomMessage, RoomNotification, RoomResponse, RoomSummary},
};
use crate::game::{
    Room,
    entities::{Action, Chips, PlayerId, RoomCode, RoomView, Username},
};

/// Registry of live rooms
pub struct RoomManager {
    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomCode, RoomHandle>>>,

    /// Applied to every room created here
    config: RoomConfig,
}

impl RoomManager {
    /// Create a new room manager
    ///
    /// # Arguments
    ///
    /// * `config` - Defaults for every room
    ///
    /// # Returns
    ///
    /// * `Result<RoomManager, RoomError>` - Manager, or the reason the config was refused
    pub fn new(config: RoomConfig) -> Result<Self, RoomError> {
        config.validate().map_err(RoomError::InvalidConfig)?;
        Ok(Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
        })
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Create a room, seat its creator as host, and spawn its actor
    ///
    /// # Arguments
    ///
    /// * `player_id` - Creator's connection identity
    /// * `name` - Creator's display name
    /// * `starting_stack` - Stack for everyone in the room, or the default
    ///
    /// # Returns
    ///
    /// * `Result<RoomCode, RoomError>` - Code others join with
    pub async fn create_room(
        &self,
        player_id: PlayerId,
        name: Username,
        starting_stack: Option<Chips>,
    ) -> Result<RoomCode, RoomError> {
        let settings = self.config.room_settings(starting_stack);

        // Hold the write lock so no other creator can claim the same code.
        let mut rooms = self.rooms.write().await;
        let code = generate_unique_code(&*rooms)?;
        let room = Room::new(code, player_id, name, settings)?;
        let (actor, handle) = RoomActor::new(room, self.config.clone());
        rooms.insert(code, handle);
        drop(rooms);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created and spawned room {code}");

        Ok(code)
    }

    /// Get a room handle
    pub async fn get_room(&self, code: RoomCode) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(&code).cloned()
    }

    /// Send a message built around a fresh reply channel and wait for the reply.
    async fn request<T>(
        &self,
        code: RoomCode,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let handle = self
            .get_room(code)
            .await
            .ok_or(RoomError::RoomNotFound(code))?;

        let (tx, rx) = oneshot::channel();
        handle.send(build(tx)).await?;
        rx.await.map_err(|_| RoomError::RoomClosed)
    }

    /// Join a room
    ///
    /// # Arguments
    ///
    /// * `code` - Room code
    /// * `player_id` - Connection identity
    /// * `name` - Display name
    ///
    /// # Returns
    ///
    /// * `Result<RoomResponse, RoomError>` - The room's answer, or why it couldn't be asked
    pub async fn join_room(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        name: Username,
    ) -> Result<RoomResponse, RoomError> {
        self.request(code, |response| RoomMessage::JoinRoom {
            player_id,
            name,
            response,
        })
        .await
    }

    /// Leave a room. The room closes once nobody is left in it.
    pub async fn leave_room(
        &self,
        code: RoomCode,
        player_id: PlayerId,
    ) -> Result<RoomResponse, RoomError> {
        let reply = self
            .request(code, |response| RoomMessage::LeaveRoom {
                player_id,
                response,
            })
            .await?;

        if reply.closed {
            self.unregister(code).await;
        }

        Ok(reply.response)
    }

    pub async fn start_game(
        &self,
        code: RoomCode,
        player_id: PlayerId,
    ) -> Result<RoomResponse, RoomError> {
        self.request(code, |response| RoomMessage::StartGame {
            player_id,
            response,
        })
        .await
    }

    pub async fn take_action(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        action: Action,
    ) -> Result<RoomResponse, RoomError> {
        self.request(code, |response| RoomMessage::TakeAction {
            player_id,
            action,
            response,
        })
        .await
    }

    pub async fn request_buy_in(
        &self,
        code: RoomCode,
        player_id: PlayerId,
    ) -> Result<RoomResponse, RoomError> {
        self.request(code, |response| RoomMessage::RequestBuyIn {
            player_id,
            response,
        })
        .await
    }

    pub async fn cast_vote(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        approve: bool,
    ) -> Result<RoomResponse, RoomError> {
        self.request(code, |response| RoomMessage::CastVote {
            player_id,
            approve,
            response,
        })
        .await
    }

    /// Room snapshot with only `player_id`'s hole cards visible.
    pub async fn get_view(
        &self,
        code: RoomCode,
        player_id: Option<PlayerId>,
    ) -> Result<RoomView, RoomError> {
        self.request(code, |response| RoomMessage::GetView {
            player_id,
            response,
        })
        .await
    }

    pub async fn get_summary(&self, code: RoomCode) -> Result<RoomSummary, RoomError> {
        self.request(code, |response| RoomMessage::GetSummary { response })
            .await
    }

    /// Subscribe to a room's notifications
    ///
    /// The subscriber gets a snapshot right away and one after every change.
    pub async fn subscribe(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        sender: mpsc::Sender<RoomNotification>,
    ) -> Result<(), RoomError> {
        let handle = self
            .get_room(code)
            .await
            .ok_or(RoomError::RoomNotFound(code))?;
        handle
            .send(RoomMessage::Subscribe { player_id, sender })
            .await
    }

    pub async fn unsubscribe(&self, code: RoomCode, player_id: PlayerId) -> Result<(), RoomError> {
        let handle = self
            .get_room(code)
            .await
            .ok_or(RoomError::RoomNotFound(code))?;
        handle.send(RoomMessage::Unsubscribe { player_id }).await
    }

    /// Close a room
    ///
    /// The code is released first so nobody can join a room on its way out.
    pub async fn close_room(&self, code: RoomCode) -> Result<(), RoomError> {
        let mut rooms = self.rooms.write().await;
        let handle = rooms.remove(&code).ok_or(RoomError::RoomNotFound(code))?;
        drop(rooms);

        let (tx, rx) = oneshot::channel();
        // An actor that already stopped counts as closed.
        if handle.send(RoomMessage::Close { response: tx }).await.is_ok() {
            let _ = rx.await;
        }

        log::info!("Closed room {code}");

        Ok(())
    }

    /// Close a room only if no command changed it since `summary` was taken.
    ///
    /// # Returns
    ///
    /// * `Result<bool, RoomError>` - Whether the room was closed
    pub async fn close_room_if_unchanged(&self, summary: &RoomSummary) -> Result<bool, RoomError> {
        let code = summary.code;
        let closed = self
            .request(code, |response| RoomMessage::CloseIfUnchanged {
                revision: summary.revision,
                response,
            })
            .await?;

        if closed {
            self.unregister(code).await;
        }

        Ok(closed)
    }

    /// Drop a stopped room's handle.
    async fn unregister(&self, code: RoomCode) {
        if self.rooms.write().await.remove(&code).is_some() {
            log::info!("Closed room {code}");
        }
    }

    pub async fn room_codes(&self) -> Vec<RoomCode> {
        let rooms = self.rooms.read().await;
        rooms.keys().copied().collect()
    }

    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
