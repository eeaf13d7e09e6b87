//! Room state: the aggregate owning one table.
//!
//! A room moves `Waiting -> Playing -> Finished -> Playing -> ...` until it
//! is torn down. Betting lives in `betting.rs`, dealing and settling in
//! `lifecycle.rs`, and the buy-in vote in `vote.rs`; all of them operate on
//! the [`Room`] defined here.

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};
use thiserror::Error;

use super::{
    betting::ActionOutcome,
    constants::{BOARD_SIZE, DEFAULT_MAX_PLAYERS, MAX_PLAYERS, MAX_STARTING_STACK},
    entities::{
        Card, Chips, DEFAULT_STARTING_STACK, Deck, HandResult, Player, PlayerId, PlayerState,
        PlayerView, RoomCode, RoomStatus, RoomView, SeatIndex, Stage, Username,
    },
    vote::BuyInVote,
};

/// Errors that can occur during user operations
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("already voted")]
    AlreadyVoted,
    #[error("can't check, {to_call} to call")]
    CannotCheck { to_call: Chips },
    #[error("can't vote on yourself")]
    CannotVoteOnSelf,
    #[error("room is full")]
    CapacityReached,
    #[error("room can't hold any more chips")]
    ChipCapReached,
    #[error("game already in progress")]
    GameAlreadyInProgress,
    #[error("can only buy in with no chips")]
    HasChips,
    #[error("need {needed} chips, have {available}")]
    InsufficientFunds { needed: Chips, available: Chips },
    #[error("raise must be greater than 0")]
    InvalidRaise,
    #[error("starting stack must be between 1 and {max}", max = MAX_STARTING_STACK)]
    InvalidStartingStack,
    #[error("no vote in progress")]
    NoVoteInProgress,
    #[error("need 2+ players")]
    NotEnoughPlayers,
    #[error("only the host can start the game")]
    NotHost,
    #[error("not your turn")]
    OutOfTurnAction,
    #[error("can't buy in while still in the hand")]
    StillInHand,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user does not exist")]
    UserDoesNotExist,
    #[error("a vote is already in progress")]
    VoteInProgress,
    #[error("invalid game state: deck exhausted")]
    DeckExhausted,
    #[error("invalid game state: internal consistency error")]
    InternalStateError,
}

/// Events that occur during gameplay
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum GameEvent {
    Joined(Username),
    LeaveQueue(Username),
    Left(Username),
    NewHost(Username),
    VoteOpened { requester: Username, required: usize },
    VoteClosed { requester: Username, passed: bool },
    HandFinished(String),
    Halted,
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Joined(username) => format!("{username} joined the room"),
            Self::LeaveQueue(username) => {
                format!("{username} will leave after the hand")
            }
            Self::Left(username) => format!("{username} left the room"),
            Self::NewHost(username) => format!("{username} is now the host"),
            Self::VoteOpened {
                requester,
                required,
            } => format!("vote to rebuy {requester} opened ({required} ballots needed)"),
            Self::VoteClosed {
                requester,
                passed: true,
            } => format!("vote to rebuy {requester} passed"),
            Self::VoteClosed {
                requester,
                passed: false,
            } => format!("vote to rebuy {requester} failed"),
            Self::HandFinished(message) => message.clone(),
            Self::Halted => "waiting for 2+ players with chips".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// Per-room settings
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomSettings {
    pub starting_stack: Chips,
    pub max_players: usize,
    /// Whether players may sit down after the first hand was dealt. Late
    /// joiners sit out until the next hand.
    pub allow_join_in_progress: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_STACK, DEFAULT_MAX_PLAYERS, false)
    }
}

impl RoomSettings {
    #[must_use]
    pub const fn new(
        starting_stack: Chips,
        max_players: usize,
        allow_join_in_progress: bool,
    ) -> Self {
        Self {
            starting_stack,
            max_players,
            allow_join_in_progress,
        }
    }
}

/// One table and everything needed to run hands on it.
#[derive(Debug)]
pub struct Room {
    pub(super) code: RoomCode,
    pub(super) status: RoomStatus,
    pub(super) stage: Stage,
    pub(super) pot: Chips,
    /// Bet every active player has to match this round.
    pub(super) current_bet: Chips,
    /// Community cards shared amongst all players.
    pub(super) board: Vec<Card>,
    /// Fresh deck per hand.
    pub(super) deck: Deck,
    /// Seating order is turn order.
    pub(super) players: Vec<Player>,
    pub(super) turn_index: Option<SeatIndex>,
    pub(super) dealer_index: Option<SeatIndex>,
    pub(super) host: PlayerId,
    pub(super) settings: RoomSettings,
    pub(super) vote: Option<BuyInVote>,
    pub(super) winner_message: Option<String>,
    pub(super) last_result: Option<HandResult>,
    pub(super) hand_number: u64,
    /// Things that happened since the owner last drained them.
    pub(super) events: VecDeque<GameEvent>,
    pub(super) rng: StdRng,
}

impl Room {
    /// Create a room with `host` seated in the first seat.
    pub fn new(
        code: RoomCode,
        host: PlayerId,
        host_name: Username,
        settings: RoomSettings,
    ) -> Result<Self, UserError> {
        Self::with_rng(code, host, host_name, settings, StdRng::from_rng(&mut rand::rng()))
    }

    /// Same as [`Room::new`] but every shuffle is drawn from a seeded
    /// generator, which makes hands reproducible.
    pub fn with_seed(
        code: RoomCode,
        host: PlayerId,
        host_name: Username,
        settings: RoomSettings,
        seed: u64,
    ) -> Result<Self, UserError> {
        Self::with_rng(code, host, host_name, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        code: RoomCode,
        host: PlayerId,
        host_name: Username,
        settings: RoomSettings,
        rng: StdRng,
    ) -> Result<Self, UserError> {
        if settings.starting_stack == 0 || settings.starting_stack > MAX_STARTING_STACK {
            return Err(UserError::InvalidStartingStack);
        }
        let max_players = settings.max_players.clamp(2, MAX_PLAYERS);
        let settings = RoomSettings {
            max_players,
            ..settings
        };
        let mut room = Self {
            code,
            status: RoomStatus::Waiting,
            stage: Stage::Preflop,
            pot: 0,
            current_bet: 0,
            board: Vec::with_capacity(BOARD_SIZE),
            deck: Deck::default(),
            players: Vec::with_capacity(max_players),
            turn_index: None,
            dealer_index: None,
            host: host.clone(),
            settings,
            vote: None,
            winner_message: None,
            last_result: None,
            hand_number: 0,
            events: VecDeque::new(),
            rng,
        };
        room.seat_player(host, host_name)?;
        Ok(room)
    }

    // === Accessors ===

    #[must_use]
    pub fn code(&self) -> RoomCode {
        self.code
    }

    #[must_use]
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn pot(&self) -> Chips {
        self.pot
    }

    #[must_use]
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    #[must_use]
    pub fn board(&self) -> &[Card] {
        &self.board
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn turn_index(&self) -> Option<SeatIndex> {
        self.turn_index
    }

    #[must_use]
    pub fn dealer_index(&self) -> Option<SeatIndex> {
        self.dealer_index
    }

    /// The player whose turn it is, if anyone may act.
    #[must_use]
    pub fn current_player(&self) -> Option<&Player> {
        self.turn_index.and_then(|idx| self.players.get(idx))
    }

    #[must_use]
    pub fn host(&self) -> &PlayerId {
        &self.host
    }

    #[must_use]
    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    #[must_use]
    pub fn vote(&self) -> Option<&BuyInVote> {
        self.vote.as_ref()
    }

    #[must_use]
    pub fn winner_message(&self) -> Option<&str> {
        self.winner_message.as_deref()
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&HandResult> {
        self.last_result.as_ref()
    }

    #[must_use]
    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    /// Players who are seated and not on their way out.
    #[must_use]
    pub fn seated_count(&self) -> usize {
        self.players.iter().filter(|p| !p.leaving).count()
    }

    /// Total chips in play: every stack plus the pot. Chips only enter a
    /// room through [`Room::can_mint`] checks, so this never overflows.
    #[must_use]
    pub fn total_chips(&self) -> Chips {
        self.players.iter().map(|p| p.chips).sum::<Chips>() + self.pot
    }

    /// Whether `amount` more chips still fit in the room's total.
    pub(super) fn can_mint(&self, amount: Chips) -> bool {
        let in_play: u64 = self
            .players
            .iter()
            .map(|p| u64::from(p.chips))
            .sum::<u64>()
            + u64::from(self.pot);
        in_play + u64::from(amount) <= u64::from(Chips::MAX)
    }

    pub fn drain_events(&mut self) -> VecDeque<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Seating ===

    pub(super) fn seat_of(&self, id: &PlayerId) -> Option<SeatIndex> {
        self.players.iter().position(|p| &p.id == id)
    }

    /// Seat a new player with the room's starting stack.
    pub fn seat_player(&mut self, id: PlayerId, name: Username) -> Result<(), UserError> {
        if self.seat_of(&id).is_some() {
            return Err(UserError::UserAlreadyExists);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(UserError::CapacityReached);
        }
        if self.status != RoomStatus::Waiting && !self.settings.allow_join_in_progress {
            return Err(UserError::GameAlreadyInProgress);
        }
        if !self.can_mint(self.settings.starting_stack) {
            return Err(UserError::ChipCapReached);
        }

        let mut player = Player::new(id, name.clone(), self.settings.starting_stack);
        if self.status == RoomStatus::Playing {
            // Sits out the running hand.
            player.state = PlayerState::Folded;
        }
        self.players.push(player);
        if let Some(vote) = self.vote.as_mut() {
            vote.add_voter();
        }
        self.events.push_back(GameEvent::Joined(name));
        Ok(())
    }

    /// Take a player out of the room. Between hands they are unseated right
    /// away; during a hand they fold and are unseated when it ends.
    pub fn remove_player(&mut self, id: &PlayerId) -> Result<ActionOutcome, UserError> {
        let seat = self.seat_of(id).ok_or(UserError::UserDoesNotExist)?;

        if self.status != RoomStatus::Playing {
            self.unseat(seat);
            return Ok(ActionOutcome::Continue);
        }

        let was_turn = self.turn_index == Some(seat);
        let player = &mut self.players[seat];
        player.leaving = true;
        if player.is_contender() {
            player.state = PlayerState::Folded;
            player.has_acted = true;
        }
        self.events
            .push_back(GameEvent::LeaveQueue(player.name.clone()));
        self.forget_voter(id);
        self.reassign_host_from(id);

        if was_turn || self.contender_count() <= 1 {
            return self.after_action(seat);
        }
        Ok(ActionOutcome::Continue)
    }

    /// Drop the player in `seat` and repair every index that pointed at or
    /// past it.
    pub(super) fn unseat(&mut self, seat: SeatIndex) {
        let player = self.players.remove(seat);
        if !player.leaving {
            // Queued leavers were already dropped from the vote.
            self.forget_voter(&player.id);
        }

        self.dealer_index = match self.dealer_index {
            _ if self.players.is_empty() => None,
            Some(dealer) if dealer > seat => Some(dealer - 1),
            // The next button lands on whoever slid into the dealer's seat.
            Some(dealer) if dealer == seat => {
                Some((seat + self.players.len() - 1) % self.players.len())
            }
            other => other,
        };
        if let Some(turn) = self.turn_index {
            self.turn_index = match turn.cmp(&seat) {
                std::cmp::Ordering::Greater => Some(turn - 1),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Less => Some(turn),
            };
        }

        self.reassign_host_from(&player.id);
        log::debug!("Room {}: {} left", self.code, player.name);
        self.events.push_back(GameEvent::Left(player.name));
    }

    /// Hand the host role to the first remaining seat if `leaving` held it.
    fn reassign_host_from(&mut self, leaving: &PlayerId) {
        if &self.host != leaving {
            return;
        }
        if let Some(next) = self.players.iter().find(|p| !p.leaving && &p.id != leaving) {
            self.host = next.id.clone();
            self.events.push_back(GameEvent::NewHost(next.name.clone()));
        }
    }

    /// Begin the first hand. Only the host may start, and at least two
    /// seated players need chips.
    pub fn start_game(&mut self, id: &PlayerId) -> Result<(), UserError> {
        self.seat_of(id).ok_or(UserError::UserDoesNotExist)?;
        if &self.host != id {
            return Err(UserError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(UserError::GameAlreadyInProgress);
        }
        if self.funded_count() < 2 {
            return Err(UserError::NotEnoughPlayers);
        }
        self.start_new_hand().map(|_| ())
    }

    // === Counting helpers ===

    pub(super) fn funded_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.chips > 0 && !p.leaving)
            .count()
    }

    pub(super) fn contender_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_contender()).count()
    }

    pub(super) fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.can_act()).count()
    }

    /// First seat after `from` (wrapping, `from` itself checked last) whose
    /// player satisfies `pred`. Visits each seat at most once.
    pub(super) fn next_seat_where(
        &self,
        from: SeatIndex,
        pred: impl Fn(&Player) -> bool,
    ) -> Option<SeatIndex> {
        let n = self.players.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&idx| pred(&self.players[idx]))
    }

    // === Views ===

    /// Snapshot for one viewer. Hole cards of other players stay hidden
    /// unless the last hand was shown down and they were still in it.
    #[must_use]
    pub fn view_for(&self, viewer: Option<&PlayerId>) -> RoomView {
        let revealed = self.status == RoomStatus::Finished
            && self.last_result.as_ref().is_some_and(|r| r.showdown);
        let players = self
            .players
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let own = viewer == Some(&p.id);
                let shown = own || (revealed && p.is_contender());
                PlayerView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    chips: p.chips,
                    bet: p.bet,
                    state: p.state,
                    cards: if shown { p.cards.clone() } else { Vec::new() },
                    has_cards: !p.cards.is_empty(),
                    is_host: p.id == self.host,
                    is_dealer: self.dealer_index == Some(idx),
                }
            })
            .collect();

        RoomView {
            code: self.code,
            status: self.status,
            stage: self.stage,
            pot: self.pot,
            current_bet: self.current_bet,
            board: self.board.clone(),
            players,
            turn: self.current_player().map(|p| p.id.clone()),
            host: self.host.clone(),
            starting_stack: self.settings.starting_stack,
            winner_message: self.winner_message.clone(),
            vote: self.vote.as_ref().map(BuyInVote::view),
            hand_number: self.hand_number,
        }
    }
}
