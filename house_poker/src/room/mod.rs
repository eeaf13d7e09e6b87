//! Room module providing the multi-room registry on top of async actors.
//!
//! This module implements:
//! - RoomActor: Async actor owning a single [`Room`](crate::game::Room)
//! - RoomManager: Registry mapping six-digit codes to room handles
//! - Reaper: Background task closing empty or idle rooms
//!
//! ## Architecture
//!
//! Each room runs in a separate Tokio task with an mpsc message inbox, so
//! commands for one room are applied strictly one after another. The
//! manager only routes by code; it never touches room state directly.
//!
//! ## Example
//!
//! ```no_run
//! use house_poker::room::{RoomConfig, RoomManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = RoomManager::new(RoomConfig::default()).unwrap();
//!     let code = manager
//!         .create_room("conn-1".into(), "alice".into(), None)
//!         .await
//!         .unwrap();
//!     manager.join_room(code, "conn-2".into(), "bob".into()).await.unwrap();
//!     manager.start_game(code, "conn-1".into()).await.unwrap();
//! }
//! ```

pub mod actor;
pub mod codes;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod reaper;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use errors::RoomError;
pub use manager::RoomManager;
pub use messages::{LeaveReply, RoomMessage, RoomNotification, RoomResponse, RoomSummary};
pub use reaper::{IdleOrEmpty, ReapPolicy, ReaperConfig, reap_rooms, start_reaper_task};
