//! Table-wide limits.

use super::entities::Chips;

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Hole cards dealt to every player in a hand.
pub const HOLE_CARDS: usize = 2;

/// Community cards on a complete board.
pub const BOARD_SIZE: usize = 5;

/// Largest number of seats such that one hand never needs more than a
/// single deck: `2 * 23 + 5 = 51`.
pub const MAX_PLAYERS: usize = 23;

/// Largest starting stack a room accepts. A full room of these still fits
/// in `Chips`.
pub const MAX_STARTING_STACK: Chips = Chips::MAX / MAX_PLAYERS as Chips;

/// Default seat cap for a new room.
pub const DEFAULT_MAX_PLAYERS: usize = 10;

/// Display names are truncated to this many characters.
pub const MAX_USER_INPUT_LENGTH: usize = 32;

/// Room codes are six decimal digits.
pub const ROOM_CODE_MIN: u32 = 100_000;
pub const ROOM_CODE_MAX: u32 = 999_999;
