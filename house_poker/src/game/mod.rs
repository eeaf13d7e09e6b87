//! Poker room engine - room state machine and game logic.
//!
//! This module provides the foundational poker implementation including:
//! - Cards, deck and hand evaluation
//! - The room aggregate and its seating rules
//! - The betting round engine and hand lifecycle
//! - The buy-in vote

pub mod betting;
pub mod constants;
pub mod entities;
pub mod functional;
pub mod lifecycle;
pub mod state_machine;
pub mod vote;

pub use betting::ActionOutcome;
pub use state_machine::{GameEvent, Room, RoomSettings, UserError};
pub use vote::BuyInVote;
