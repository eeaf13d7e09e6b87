//! Buy-in vote: a player with no chips asks the table for a fresh stack.
//!
//! Every other seated player gets one ballot. Once all ballots are in, a
//! strict majority of yes grants the starting stack; anything else denies.
//! The vote is discarded after the tally either way.

use std::collections::HashMap;

use super::{
    entities::{PlayerId, PlayerState, RoomStatus, VoteView},
    state_machine::{GameEvent, Room, UserError},
};

#[derive(Clone, Debug, PartialEq)]
pub struct BuyInVote {
    requester: PlayerId,
    ballots: HashMap<PlayerId, bool>,
    required: usize,
}

impl BuyInVote {
    #[must_use]
    pub fn new(requester: PlayerId, required: usize) -> Self {
        Self {
            requester,
            ballots: HashMap::with_capacity(required),
            required,
        }
    }

    #[must_use]
    pub fn requester(&self) -> &PlayerId {
        &self.requester
    }

    #[must_use]
    pub fn required(&self) -> usize {
        self.required
    }

    #[must_use]
    pub fn yes_count(&self) -> usize {
        self.ballots.values().filter(|&&approve| approve).count()
    }

    #[must_use]
    pub fn no_count(&self) -> usize {
        self.ballots.len() - self.yes_count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.ballots.len() >= self.required
    }

    /// Strict majority of the required ballots voted yes.
    #[must_use]
    pub fn passed(&self) -> bool {
        2 * self.yes_count() > self.required
    }

    fn cast(&mut self, voter: &PlayerId, approve: bool) -> Result<(), UserError> {
        if voter == &self.requester {
            return Err(UserError::CannotVoteOnSelf);
        }
        if self.ballots.contains_key(voter) {
            return Err(UserError::AlreadyVoted);
        }
        self.ballots.insert(voter.clone(), approve);
        Ok(())
    }

    /// Someone sat down mid-vote and gets a ballot too.
    pub(super) fn add_voter(&mut self) {
        self.required += 1;
    }

    fn remove_voter(&mut self, voter: &PlayerId) {
        self.ballots.remove(voter);
        self.required = self.required.saturating_sub(1);
    }

    #[must_use]
    pub fn view(&self) -> VoteView {
        VoteView {
            requester: self.requester.clone(),
            yes: self.yes_count(),
            no: self.no_count(),
            required: self.required,
        }
    }
}

impl Room {
    /// Open a buy-in vote for a player with no chips.
    pub fn request_buy_in(&mut self, id: &PlayerId) -> Result<(), UserError> {
        let seat = self.seated_voter(id)?;
        if self.vote.is_some() {
            return Err(UserError::VoteInProgress);
        }
        let player = &self.players[seat];
        if player.chips > 0 {
            return Err(UserError::HasChips);
        }
        if self.status == RoomStatus::Playing && player.is_contender() {
            return Err(UserError::StillInHand);
        }
        if !self.can_mint(self.settings.starting_stack) {
            return Err(UserError::ChipCapReached);
        }

        let required = self
            .players
            .iter()
            .filter(|p| !p.leaving && &p.id != id)
            .count();
        self.events.push_back(GameEvent::VoteOpened {
            requester: player.name.clone(),
            required,
        });
        log::info!(
            "Room {}: {} requested a buy-in, {required} ballots needed",
            self.code,
            player.name
        );
        self.vote = Some(BuyInVote::new(id.clone(), required));
        self.tally_vote();
        Ok(())
    }

    /// Register one ballot. Returns the outcome once the last ballot is in.
    pub fn cast_vote(&mut self, id: &PlayerId, approve: bool) -> Result<Option<bool>, UserError> {
        self.seated_voter(id)?;
        let vote = self.vote.as_mut().ok_or(UserError::NoVoteInProgress)?;
        vote.cast(id, approve)?;
        Ok(self.tally_vote())
    }

    /// Close the vote if every ballot is in.
    fn tally_vote(&mut self) -> Option<bool> {
        if !self.vote.as_ref().is_some_and(BuyInVote::is_complete) {
            return None;
        }
        let vote = self.vote.take()?;
        // Players seated since the request may have used up the headroom.
        let passed = vote.passed() && self.can_mint(self.settings.starting_stack);
        let seat = self.seat_of(vote.requester())?;
        let starting_stack = self.settings.starting_stack;
        let player = &mut self.players[seat];
        if passed {
            player.chips = starting_stack;
            // Eligible again from the next hand.
            player.state = PlayerState::Folded;
        }
        log::info!(
            "Room {}: buy-in for {} {} ({} yes / {} no)",
            self.code,
            player.name,
            if passed { "passed" } else { "denied" },
            vote.yes_count(),
            vote.no_count()
        );
        self.events.push_back(GameEvent::VoteClosed {
            requester: player.name.clone(),
            passed,
        });
        Some(passed)
    }

    /// Seat of a player who takes part in votes. Players queued to leave
    /// don't.
    fn seated_voter(&self, id: &PlayerId) -> Result<usize, UserError> {
        self.seat_of(id)
            .filter(|&seat| !self.players[seat].leaving)
            .ok_or(UserError::UserDoesNotExist)
    }

    /// Drop `id` from a running vote: the vote ends if they requested it,
    /// otherwise their ballot no longer counts.
    pub(super) fn forget_voter(&mut self, id: &PlayerId) {
        let Some(vote) = self.vote.as_mut() else {
            return;
        };
        if vote.requester() == id {
            self.vote = None;
            return;
        }
        vote.remove_voter(id);
        self.tally_vote();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        entities::{Chips, RoomCode},
        state_machine::RoomSettings,
    };

    fn id(name: &str) -> PlayerId {
        PlayerId::from(name)
    }

    fn room(names: &[&str], stack: Chips) -> Room {
        let mut room = Room::with_seed(
            RoomCode::new(333_333).unwrap(),
            id(names[0]),
            names[0].into(),
            RoomSettings::new(stack, 9, false),
            3,
        )
        .unwrap();
        for name in &names[1..] {
            room.seat_player(id(name), (*name).into()).unwrap();
        }
        room
    }

    #[test]
    fn test_majority_passes() {
        let mut room = room(&["a", "b", "c", "d"], 500);
        room.players[3].chips = 0;
        room.request_buy_in(&id("d")).unwrap();
        assert_eq!(room.vote().unwrap().required(), 3);
        assert_eq!(room.cast_vote(&id("a"), true), Ok(None));
        assert_eq!(room.cast_vote(&id("b"), false), Ok(None));
        assert_eq!(room.cast_vote(&id("c"), true), Ok(Some(true)));
        let d = room.player(&id("d")).unwrap();
        assert_eq!(d.chips, 500);
        assert_eq!(d.state, PlayerState::Folded);
        assert!(room.vote().is_none());
    }

    #[test]
    fn test_split_vote_denied() {
        let mut room = room(&["a", "b", "c"], 500);
        room.players[2].chips = 0;
        room.request_buy_in(&id("c")).unwrap();
        room.cast_vote(&id("a"), true).unwrap();
        assert_eq!(room.cast_vote(&id("b"), false), Ok(Some(false)));
        assert_eq!(room.player(&id("c")).unwrap().chips, 0);
        assert!(room.vote().is_none());
    }

    #[test]
    fn test_request_rules() {
        let mut room = room(&["a", "b", "c"], 500);
        assert_eq!(room.request_buy_in(&id("a")), Err(UserError::HasChips));
        assert_eq!(
            room.cast_vote(&id("a"), true),
            Err(UserError::NoVoteInProgress)
        );

        room.players[1].chips = 0;
        room.players[2].chips = 0;
        room.request_buy_in(&id("b")).unwrap();
        assert_eq!(room.request_buy_in(&id("c")), Err(UserError::VoteInProgress));
        assert_eq!(
            room.cast_vote(&id("b"), true),
            Err(UserError::CannotVoteOnSelf)
        );
        room.cast_vote(&id("a"), true).unwrap();
        assert_eq!(room.cast_vote(&id("a"), true), Err(UserError::AlreadyVoted));
    }

    #[test]
    fn test_voter_leaving_completes_tally() {
        let mut room = room(&["a", "b", "c"], 500);
        room.players[2].chips = 0;
        room.request_buy_in(&id("c")).unwrap();
        room.cast_vote(&id("a"), true).unwrap();
        room.remove_player(&id("b")).unwrap();
        assert!(room.vote().is_none());
        assert_eq!(room.player(&id("c")).unwrap().chips, 500);
    }

    #[test]
    fn test_players_queued_to_leave_take_no_part() {
        let mut room = room(&["a", "b", "c", "d"], 500);
        room.players[2].chips = 0;
        room.players[2].leaving = true;
        assert_eq!(room.request_buy_in(&id("c")), Err(UserError::UserDoesNotExist));

        room.players[3].chips = 0;
        room.players[1].leaving = true;
        room.request_buy_in(&id("d")).unwrap();
        // Only "a" is left to vote.
        assert_eq!(room.vote().unwrap().required(), 1);
        assert_eq!(room.cast_vote(&id("b"), false), Err(UserError::UserDoesNotExist));
        assert_eq!(room.cast_vote(&id("a"), true), Ok(Some(true)));
        assert_eq!(room.player(&id("d")).unwrap().chips, 500);
    }

    #[test]
    fn test_buy_in_refused_past_chip_cap() {
        let mut room = room(&["a", "b", "c"], 1000);
        room.players[0].chips = Chips::MAX - 1500;
        room.players[2].chips = 0;
        assert_eq!(room.request_buy_in(&id("c")), Err(UserError::ChipCapReached));
        assert!(room.vote().is_none());

        // Exactly at the cap still fits.
        room.players[0].chips = Chips::MAX - 2000;
        room.request_buy_in(&id("c")).unwrap();
        room.cast_vote(&id("a"), true).unwrap();
        assert_eq!(room.cast_vote(&id("b"), true), Ok(Some(true)));
        assert_eq!(room.total_chips(), Chips::MAX);
    }

    #[test]
    fn test_lone_requester_denied_immediately() {
        let mut room = room(&["a"], 500);
        room.players[0].chips = 0;
        room.request_buy_in(&id("a")).unwrap();
        assert!(room.vote().is_none());
        assert!(room.drain_events().contains(&GameEvent::VoteClosed {
            requester: "a".into(),
            passed: false
        }));
    }
}
