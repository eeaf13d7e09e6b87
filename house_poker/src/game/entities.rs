use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::{
    constants::{self, DECK_SIZE},
    state_machine::UserError,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Club, Self::Diamond, Self::Heart, Self::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// A card is a tuple of a value (2..=14, ace high) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// Hand categories from weakest to strongest. The discriminant is the
/// category's weight in a strength score.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "High Card",
            Self::OnePair => "One Pair",
            Self::TwoPair => "Two Pair",
            Self::ThreeOfAKind => "Three of a Kind",
            Self::Straight => "Straight",
            Self::Flush => "Flush",
            Self::FullHouse => "Full House",
            Self::FourOfAKind => "Four of a Kind",
            Self::StraightFlush => "Straight Flush",
        };
        write!(f, "{repr}")
    }
}

/// A deck is built fresh for every hand and dealt from the back.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Remove and return the top card.
    pub fn deal_card(&mut self) -> Result<Card, UserError> {
        self.cards.pop().ok_or(UserError::DeckExhausted)
    }

    /// Fisher-Yates shuffle with the thread-local generator.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::rng());
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards still in the deck, bottom first.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for value in 2u8..=14 {
            for suit in Suit::ALL {
                cards.push(Card(value, suit));
            }
        }
        Self { cards }
    }
}

/// Type alias for chip counts. Stacks, bets and pots are whole chips.
pub type Chips = u32;

/// Stack given to every seated player unless the room says otherwise.
pub const DEFAULT_STARTING_STACK: Chips = 1000;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .take(constants::MAX_USER_INPUT_LENGTH)
            .collect();
        if username.is_empty() {
            username.push_str("player");
        }
        Self(username)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque identity of a seated player, handed out by the transport.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("invalid room code: {0}")]
pub struct InvalidRoomCode(pub String);

/// Six digit external key of a room.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RoomCode(u32);

impl RoomCode {
    /// Wrap a value, rejecting anything outside the six digit range.
    pub fn new(value: u32) -> Result<Self, InvalidRoomCode> {
        if (constants::ROOM_CODE_MIN..=constants::ROOM_CODE_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRoomCode(value.to_string()))
        }
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomCode {
    type Err = InvalidRoomCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u32>()
            .map_err(|_| InvalidRoomCode(s.to_string()))?;
        Self::new(value)
    }
}

/// Type alias for seat positions during the game.
pub type SeatIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    /// Increment on top of the current table bet.
    Raise(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "folds"),
            Self::Check => write!(f, "checks"),
            Self::Call => write!(f, "calls"),
            Self::Raise(amount) => write!(f, "raises by {amount}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlayerState {
    // In the hand and able to bet.
    Active,
    // Out of the current hand (or sitting it out).
    Folded,
    // Whole stack committed; waits for showdown.
    AllIn,
    // No chips at the start of the hand.
    Busted,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::Busted => "busted",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Stage {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Stage {
    /// The stage that follows this one along with the number of community
    /// cards revealed when entering it. `None` after the river.
    #[must_use]
    pub const fn next(self) -> Option<(Self, usize)> {
        match self {
            Self::Preflop => Some((Self::Flop, 3)),
            Self::Flop => Some((Self::Turn, 1)),
            Self::Turn => Some((Self::River, 1)),
            Self::River | Self::Showdown => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    pub name: Username,
    pub chips: Chips,
    /// Zero or two hole cards.
    pub cards: Vec<Card>,
    /// Chips put in during the current betting round.
    pub bet: Chips,
    /// Chips put in during the current hand.
    pub invested: Chips,
    pub state: PlayerState,
    pub has_acted: bool,
    /// Queued for removal once the running hand ends.
    pub leaving: bool,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, name: Username, chips: Chips) -> Self {
        Self {
            id,
            name,
            chips,
            cards: Vec::with_capacity(constants::HOLE_CARDS),
            bet: 0,
            invested: 0,
            state: PlayerState::Active,
            has_acted: false,
            leaving: false,
        }
    }

    pub fn reset_for_hand(&mut self) {
        self.cards.clear();
        self.bet = 0;
        self.invested = 0;
        self.has_acted = false;
        self.state = if self.chips == 0 {
            PlayerState::Busted
        } else {
            PlayerState::Active
        };
    }

    pub fn reset_for_round(&mut self) {
        self.bet = 0;
        self.has_acted = false;
    }

    /// Still eligible for the pot.
    #[must_use]
    pub fn is_contender(&self) -> bool {
        matches!(self.state, PlayerState::Active | PlayerState::AllIn)
    }

    #[must_use]
    pub fn can_act(&self) -> bool {
        self.state == PlayerState::Active
    }

    #[must_use]
    pub fn to_call(&self, current_bet: Chips) -> Chips {
        current_bet.saturating_sub(self.bet)
    }

    /// Move chips from the stack into the current bet. The caller is
    /// responsible for checking the stack covers `amount`.
    pub fn commit(&mut self, amount: Chips) {
        self.chips -= amount;
        self.bet += amount;
        self.invested += amount;
        if self.chips == 0 {
            self.state = PlayerState::AllIn;
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Payout {
    pub player: PlayerId,
    pub name: Username,
    pub amount: Chips,
}

/// Outcome of a finished hand.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResult {
    pub payouts: Vec<Payout>,
    /// Winning category when the hand reached showdown.
    pub rank: Option<Rank>,
    pub message: String,
    pub showdown: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: Username,
    pub chips: Chips,
    pub bet: Chips,
    pub state: PlayerState,
    /// Empty unless the viewer owns the cards or they were shown down.
    pub cards: Vec<Card>,
    pub has_cards: bool,
    pub is_host: bool,
    pub is_dealer: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VoteView {
    pub requester: PlayerId,
    pub yes: usize,
    pub no: usize,
    pub required: usize,
}

/// Snapshot of a room as seen by one viewer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomView {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub stage: Stage,
    pub pot: Chips,
    pub current_bet: Chips,
    pub board: Vec<Card>,
    pub players: Vec<PlayerView>,
    pub turn: Option<PlayerId>,
    pub host: PlayerId,
    pub starting_stack: Chips,
    pub winner_message: Option<String>,
    pub vote: Option<VoteView>,
    pub hand_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;

    // === Deck ===

    #[test]
    fn test_deck_has_52_distinct_cards() {
        let deck = Deck::default();
        let unique: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(deck.remaining(), 52);
        assert_eq!(unique.len(), 52);
        assert!(deck.cards().iter().all(|c| (2..=14).contains(&c.0)));
    }

    #[test]
    fn test_deck_deal_until_exhausted() {
        let mut deck = Deck::default();
        deck.shuffle();
        let mut dealt = HashSet::new();
        for expected_remaining in (0..52).rev() {
            let card = deck.deal_card().unwrap();
            assert!(dealt.insert(card), "{card} dealt twice");
            assert_eq!(deck.remaining(), expected_remaining);
        }
        assert!(deck.is_empty());
        assert_eq!(deck.deal_card(), Err(UserError::DeckExhausted));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let mut a = Deck::default();
        let mut b = Deck::default();
        a.shuffle_with(&mut StdRng::seed_from_u64(7));
        b.shuffle_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a.cards(), b.cards());
        assert_ne!(a.cards(), Deck::default().cards());
    }

    // === Display ===

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), "A♠");
        assert_eq!(Card(10, Suit::Heart).to_string(), "10♥");
        assert_eq!(Card(12, Suit::Club).to_string(), "Q♣");
    }

    #[test]
    fn test_rank_ordering_and_display() {
        assert!(Rank::StraightFlush > Rank::FourOfAKind);
        assert!(Rank::FullHouse > Rank::Flush);
        assert!(Rank::OnePair > Rank::HighCard);
        assert_eq!(Rank::FullHouse.to_string(), "Full House");
    }

    // === Identities ===

    #[test]
    fn test_username_sanitized() {
        assert_eq!(Username::new("  big  blind ").as_str(), "big__blind");
        assert_eq!(Username::new("   ").as_str(), "player");
        let long = "x".repeat(100);
        assert_eq!(
            Username::new(&long).as_str().len(),
            constants::MAX_USER_INPUT_LENGTH
        );
    }

    #[test]
    fn test_room_code_parsing() {
        assert_eq!("123456".parse::<RoomCode>().unwrap().value(), 123_456);
        assert!("99999".parse::<RoomCode>().is_err());
        assert!("1000000".parse::<RoomCode>().is_err());
        assert!("abc".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_identities_serialize_transparently() {
        let code = RoomCode::new(123_456).unwrap();
        assert_eq!(serde_json::to_value(code).unwrap(), serde_json::json!(123_456));
        assert_eq!(
            serde_json::to_value(PlayerId::from("conn-1")).unwrap(),
            serde_json::json!("conn-1")
        );
        let name: Username = serde_json::from_str("\"  big blind \"").unwrap();
        assert_eq!(name.as_str(), "big_blind");
    }

    // === Player ===

    #[test]
    fn test_player_commit_whole_stack_goes_all_in() {
        let mut player = Player::new("p1".into(), "alice".into(), 100);
        player.commit(40);
        assert_eq!((player.chips, player.bet, player.invested), (60, 40, 40));
        assert_eq!(player.state, PlayerState::Active);
        player.commit(60);
        assert_eq!(player.state, PlayerState::AllIn);
        assert_eq!(player.to_call(150), 50);
    }

    #[test]
    fn test_player_reset_marks_busted() {
        let mut player = Player::new("p1".into(), "alice".into(), 0);
        player.bet = 10;
        player.cards.push(Card(2, Suit::Club));
        player.reset_for_hand();
        assert_eq!(player.state, PlayerState::Busted);
        assert!(player.cards.is_empty());
        assert_eq!(player.bet, 0);
    }

    #[test]
    fn test_stage_progression() {
        assert_eq!(Stage::Preflop.next(), Some((Stage::Flop, 3)));
        assert_eq!(Stage::Flop.next(), Some((Stage::Turn, 1)));
        assert_eq!(Stage::Turn.next(), Some((Stage::River, 1)));
        assert_eq!(Stage::River.next(), None);
    }
}
