//! Betting round engine.
//!
//! Only the player at the turn cursor may act. Check/call and fold never
//! reopen a round; a raise always does, by clearing everybody else's
//! "has acted" flag. A round is complete once every active player has
//! acted and matched the table bet.

use super::{
    entities::{Action, Chips, HandResult, PlayerId, PlayerState, RoomStatus, SeatIndex, Stage},
    state_machine::{Room, UserError},
};

/// What happened to the hand as a result of an action.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// Same round, turn moved on.
    Continue,
    /// Betting round closed and the next street was dealt.
    StageAdvanced(Stage),
    /// The hand is over and the pot was paid out.
    HandEnded(HandResult),
}

impl Room {
    /// Validate and apply one betting action. Rejected actions leave the
    /// room untouched.
    pub fn take_action(
        &mut self,
        id: &PlayerId,
        action: Action,
    ) -> Result<ActionOutcome, UserError> {
        let seat = self.seat_of(id).ok_or(UserError::UserDoesNotExist)?;
        if self.status != RoomStatus::Playing || self.turn_index != Some(seat) {
            return Err(UserError::OutOfTurnAction);
        }

        let current_bet = self.current_bet;
        let player = &self.players[seat];
        let to_call = player.to_call(current_bet);

        // Validate everything before touching any state.
        let commitment: Chips = match action {
            Action::Fold => 0,
            Action::Check if to_call > 0 => return Err(UserError::CannotCheck { to_call }),
            Action::Check => 0,
            Action::Call => to_call.min(player.chips),
            Action::Raise(0) => return Err(UserError::InvalidRaise),
            Action::Raise(amount) => {
                let needed = current_bet
                    .checked_add(amount)
                    .map(|target| target - player.bet)
                    .ok_or(UserError::InsufficientFunds {
                        needed: Chips::MAX,
                        available: player.chips,
                    })?;
                if needed > player.chips {
                    return Err(UserError::InsufficientFunds {
                        needed,
                        available: player.chips,
                    });
                }
                needed
            }
        };

        log::debug!(
            "Room {}: {} {action} (to call {to_call})",
            self.code,
            self.players[seat].name
        );

        let player = &mut self.players[seat];
        match action {
            Action::Fold => player.state = PlayerState::Folded,
            Action::Check => {}
            Action::Call => player.commit(commitment),
            Action::Raise(amount) => {
                player.commit(commitment);
                self.current_bet = current_bet + amount;
                // A raise reopens the round for everyone else.
                for (idx, other) in self.players.iter_mut().enumerate() {
                    if idx != seat && other.can_act() {
                        other.has_acted = false;
                    }
                }
            }
        }
        self.pot += commitment;
        self.players[seat].has_acted = true;

        self.after_action(seat)
    }

    /// Every active player has acted and matched the table bet.
    #[must_use]
    pub fn is_round_complete(&self) -> bool {
        self.players
            .iter()
            .filter(|p| p.can_act())
            .all(|p| p.has_acted && p.bet == self.current_bet)
    }

    /// Decide what follows an action taken from `seat`: a fold-win, the
    /// next street, or the next player's turn.
    pub(super) fn after_action(&mut self, seat: SeatIndex) -> Result<ActionOutcome, UserError> {
        if self.contender_count() <= 1 {
            let winner = self
                .players
                .iter()
                .position(|p| p.is_contender())
                .ok_or(UserError::InternalStateError)?;
            let result = self.end_hand(vec![winner], None, false);
            return Ok(ActionOutcome::HandEnded(result));
        }

        if self.is_round_complete() {
            return self.advance_stage();
        }

        self.turn_index = self.next_seat_where(seat, |p| p.can_act());
        if self.turn_index.is_none() {
            log::error!("Room {}: open round with nobody to act", self.code);
            return Err(UserError::InternalStateError);
        }
        Ok(ActionOutcome::Continue)
    }

    /// Close the current betting round and deal the next street. When fewer
    /// than two players can still bet, the rest of the board is dealt out
    /// and the hand goes straight to showdown.
    pub(super) fn advance_stage(&mut self) -> Result<ActionOutcome, UserError> {
        loop {
            for player in &mut self.players {
                player.reset_for_round();
            }
            self.current_bet = 0;

            let Some((next, cards)) = self.stage.next() else {
                let result = self.showdown()?;
                return Ok(ActionOutcome::HandEnded(result));
            };
            for _ in 0..cards {
                let card = self.deck.deal_card()?;
                self.board.push(card);
            }
            self.stage = next;
            log::debug!(
                "Room {}: {} [{}]",
                self.code,
                self.stage,
                self.board
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            );

            if self.active_count() >= 2 {
                let dealer = self.dealer_index.unwrap_or(self.players.len() - 1);
                self.turn_index = self.next_seat_where(dealer, |p| p.can_act());
                return Ok(ActionOutcome::StageAdvanced(self.stage));
            }
            self.turn_index = None;
        }
    }
}
