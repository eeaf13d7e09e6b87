//! # House Poker
//!
//! A server-authoritative Texas Hold'em engine for private rooms played
//! with friends. Clients only send intents; every rule is enforced here.
//!
//! ## Architecture
//!
//! A hand moves through four betting stages before a result is settled:
//!
//! - **Preflop**: Two hole cards each, no community cards
//! - **Flop**: Three community cards
//! - **Turn/River**: One community card each
//!
//! Once only one contender remains the pot is awarded without a showdown.
//! Otherwise the best five of seven cards wins, and ties split the pot.
//! There are no blinds: every hand opens with nothing to call.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand evaluation, the room state machine and buy-in votes
//! - [`room`]: Per-room actors, the room registry and the idle reaper
//!
//! ## Example
//!
//! ```
//! use house_poker::{Room, RoomSettings, entities::{Action, RoomCode}};
//!
//! let code = RoomCode::new(123_456).unwrap();
//! let mut room = Room::new(code, "a".into(), "alice".into(), RoomSettings::default()).unwrap();
//! room.seat_player("b".into(), "bob".into()).unwrap();
//! room.start_game(&"a".into()).unwrap();
//! let first = room.current_player().unwrap().id.clone();
//! room.take_action(&first, Action::Fold).unwrap();
//! assert_eq!(room.pot(), 0);
//! ```

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    ActionOutcome, BuyInVote, GameEvent, Room, RoomSettings, UserError,
    constants::{self, DEFAULT_MAX_PLAYERS, MAX_PLAYERS},
    entities::{self, DEFAULT_STARTING_STACK},
    functional,
};

/// Room actors and the registry routing commands to them.
pub mod room;
pub use room::{RoomConfig, RoomError, RoomManager};
