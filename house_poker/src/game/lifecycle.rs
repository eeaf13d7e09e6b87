//! Hand lifecycle: deal, settle, re-deal.

use super::{
    constants::HOLE_CARDS,
    entities::{Deck, HandResult, Payout, PlayerState, Rank, RoomStatus, SeatIndex, Stage},
    functional::{HandStrength, argmax, eval},
    state_machine::{GameEvent, Room, UserError},
};

impl Room {
    /// Deal a new hand.
    ///
    /// Players queued to leave are unseated first. Returns `Ok(false)` and
    /// puts the room back into waiting when fewer than two players have
    /// chips.
    pub fn start_new_hand(&mut self) -> Result<bool, UserError> {
        while let Some(seat) = self.players.iter().position(|p| p.leaving) {
            self.unseat(seat);
        }

        self.pot = 0;
        self.current_bet = 0;
        self.board.clear();
        self.winner_message = None;
        self.last_result = None;
        self.stage = Stage::Preflop;
        self.turn_index = None;
        for player in &mut self.players {
            player.reset_for_hand();
        }

        if self.funded_count() < 2 {
            self.status = RoomStatus::Waiting;
            self.events.push_back(GameEvent::Halted);
            log::info!("Room {}: not enough funded players, waiting", self.code);
            return Ok(false);
        }

        // First hand puts the button on the last funded seat so the first
        // seat acts first.
        let dealer = match self.dealer_index {
            Some(dealer) => self.next_seat_where(dealer, |p| p.chips > 0),
            None => self.players.iter().rposition(|p| p.chips > 0),
        }
        .ok_or(UserError::InternalStateError)?;
        self.dealer_index = Some(dealer);

        self.deck = Deck::default();
        self.deck.shuffle_with(&mut self.rng);
        let n = self.players.len();
        for _ in 0..HOLE_CARDS {
            for offset in 1..=n {
                let seat = (dealer + offset) % n;
                if self.players[seat].state == PlayerState::Active {
                    let card = self.deck.deal_card()?;
                    self.players[seat].cards.push(card);
                }
            }
        }

        self.status = RoomStatus::Playing;
        self.hand_number += 1;
        self.turn_index = self.next_seat_where(dealer, |p| p.can_act());
        log::info!(
            "Room {}: hand {} dealt, {} seated, dealer seat {dealer}",
            self.code,
            self.hand_number,
            n
        );
        Ok(true)
    }

    /// Evaluate every contender's best hand against the board. Returns the
    /// seats holding the best score (more than one on a tie) and its
    /// category.
    pub fn determine_winners(&self) -> Result<(Vec<SeatIndex>, Rank), UserError> {
        let mut seats = Vec::new();
        let mut strengths: Vec<HandStrength> = Vec::new();
        for (seat, player) in self.players.iter().enumerate() {
            if !player.is_contender() {
                continue;
            }
            let cards: Vec<_> = player.cards.iter().chain(&self.board).copied().collect();
            let strength = eval(&cards).map_err(|e| {
                log::error!("Room {}: can't evaluate {}: {e}", self.code, player.name);
                UserError::InternalStateError
            })?;
            seats.push(seat);
            strengths.push(strength);
        }

        let best = argmax(&strengths);
        let rank = best
            .first()
            .map(|&i| strengths[i].rank)
            .ok_or(UserError::InternalStateError)?;
        Ok((best.into_iter().map(|i| seats[i]).collect(), rank))
    }

    pub(super) fn showdown(&mut self) -> Result<HandResult, UserError> {
        self.stage = Stage::Showdown;
        self.turn_index = None;
        let (winners, rank) = self.determine_winners()?;
        Ok(self.end_hand(winners, Some(rank), true))
    }

    /// Pay the pot to `winners` and finish the hand.
    ///
    /// The pot is split evenly; leftover chips go one each to the winners
    /// closest to the left of the dealer.
    pub fn end_hand(
        &mut self,
        mut winners: Vec<SeatIndex>,
        rank: Option<Rank>,
        showdown: bool,
    ) -> HandResult {
        let n = self.players.len();
        let dealer = self.dealer_index.unwrap_or(n.saturating_sub(1));
        winners.sort_by_key(|&seat| (seat + n - dealer - 1) % n);

        let count = winners.len().max(1) as u32;
        let share = self.pot / count;
        let mut odd_chips = self.pot % count;
        let mut payouts = Vec::with_capacity(winners.len());
        for &seat in &winners {
            let mut amount = share;
            if odd_chips > 0 {
                amount += 1;
                odd_chips -= 1;
            }
            let player = &mut self.players[seat];
            player.chips += amount;
            payouts.push(Payout {
                player: player.id.clone(),
                name: player.name.clone(),
                amount,
            });
        }
        if !winners.is_empty() {
            self.pot = 0;
        }

        // Present winners in seat order.
        let mut names: Vec<_> = winners
            .iter()
            .copied()
            .map(|seat| (seat, self.players[seat].name.to_string()))
            .collect();
        names.sort_by_key(|(seat, _)| *seat);
        let names: Vec<String> = names.into_iter().map(|(_, name)| name).collect();
        let message = match (names.as_slice(), rank) {
            ([name], Some(rank)) if showdown => format!("{name} wins with {rank}"),
            ([name], _) => format!("{name} wins!"),
            ([rest @ .., last], Some(rank)) => {
                format!("{} and {last} split the pot with {rank}", rest.join(", "))
            }
            ([rest @ .., last], None) => format!("{} and {last} split the pot", rest.join(", ")),
            ([], _) => "nobody wins".to_string(),
        };

        log::info!("Room {}: {message}", self.code);
        let result = HandResult {
            payouts,
            rank: rank.filter(|_| showdown),
            message: message.clone(),
            showdown,
        };
        self.status = RoomStatus::Finished;
        self.turn_index = None;
        self.winner_message = Some(message.clone());
        self.last_result = Some(result.clone());
        self.events.push_back(GameEvent::HandFinished(message));
        result
    }

    /// Give every player back what they put in this hand and return to
    /// waiting. Used when a hand can't be completed.
    pub fn abandon_hand(&mut self) {
        for player in &mut self.players {
            player.chips += player.invested;
            player.invested = 0;
            player.bet = 0;
        }
        self.pot = 0;
        self.current_bet = 0;
        self.turn_index = None;
        self.status = RoomStatus::Waiting;
        log::warn!("Room {}: hand {} abandoned", self.code, self.hand_number);
    }
}
