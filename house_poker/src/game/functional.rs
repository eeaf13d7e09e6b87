//! Hand evaluation.
//!
//! Every 5-card hand maps to a single `u32` score:
//! `category * 15^5 + tiebreaker`, where the tiebreaker packs the
//! category-relevant values as base-15 digits in descending significance.
//! Card values run 2..=14 so no digit can overflow into the next, and the
//! largest tiebreaker stays below `15^5`, so the category always dominates.
//! Equal scores are genuine ties.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use super::entities::{Card, Rank, Value};

/// Weight of one category step; larger than any tiebreaker.
pub const CATEGORY_BASE: u32 = 15u32.pow(5);

const DIGIT_BASE: u32 = 15;

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum EvalError {
    #[error("need 5 to 7 cards, got {0}")]
    InvalidCardCount(usize),
}

/// The best 5-card hand found within a set of cards.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandStrength {
    pub rank: Rank,
    pub score: u32,
}

impl Ord for HandStrength {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.cmp(&other.score)
    }
}

impl PartialOrd for HandStrength {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn pack(values: &[Value]) -> u32 {
    values
        .iter()
        .fold(0, |acc, &value| acc * DIGIT_BASE + u32::from(value))
}

/// High card of a straight, treating A-5-4-3-2 as five high. Expects values
/// sorted descending.
fn straight_high(values: &[Value; 5]) -> Option<Value> {
    if *values == [14, 5, 4, 3, 2] {
        return Some(5);
    }
    let consecutive = values.windows(2).all(|w| w[0] == w[1] + 1);
    consecutive.then_some(values[0])
}

/// Score exactly five cards.
#[must_use]
pub fn score_five(cards: &[Card; 5]) -> HandStrength {
    let mut values = cards.map(|card| card.0);
    values.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|card| card.1 == cards[0].1);
    let straight = straight_high(&values);

    // (count, value) groups, most frequent first, then highest value first.
    // Packing the group values in this order yields the tiebreaker for
    // every category built from pairs, trips and quads.
    let mut groups: Vec<(u8, Value)> = Vec::with_capacity(5);
    for &value in &values {
        match groups.iter_mut().find(|(_, v)| *v == value) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, value)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));
    let counts: Vec<u8> = groups.iter().map(|(count, _)| *count).collect();
    let grouped: Vec<Value> = groups.iter().map(|(_, value)| *value).collect();

    let (rank, tiebreaker) = match (straight, is_flush, counts.as_slice()) {
        (Some(high), true, _) => (Rank::StraightFlush, u32::from(high)),
        (_, _, [4, 1]) => (Rank::FourOfAKind, pack(&grouped)),
        (_, _, [3, 2]) => (Rank::FullHouse, pack(&grouped)),
        (_, true, _) => (Rank::Flush, pack(&values)),
        (Some(high), false, _) => (Rank::Straight, u32::from(high)),
        (_, _, [3, 1, 1]) => (Rank::ThreeOfAKind, pack(&grouped)),
        (_, _, [2, 2, 1]) => (Rank::TwoPair, pack(&grouped)),
        (_, _, [2, 1, 1, 1]) => (Rank::OnePair, pack(&grouped)),
        _ => (Rank::HighCard, pack(&values)),
    };

    HandStrength {
        rank,
        score: rank as u32 * CATEGORY_BASE + tiebreaker,
    }
}

/// Best hand among every 5-card subset of 5 to 7 cards.
pub fn eval(cards: &[Card]) -> Result<HandStrength, EvalError> {
    let n = cards.len();
    if !(5..=7).contains(&n) {
        return Err(EvalError::InvalidCardCount(n));
    }

    let mut best: Option<HandStrength> = None;
    for a in 0..n {
        for b in a + 1..n {
            for c in b + 1..n {
                for d in c + 1..n {
                    for e in d + 1..n {
                        let strength =
                            score_five(&[cards[a], cards[b], cards[c], cards[d], cards[e]]);
                        if best.is_none_or(|current| strength > current) {
                            best = Some(strength);
                        }
                    }
                }
            }
        }
    }

    // n >= 5 guarantees at least one subset.
    best.ok_or(EvalError::InvalidCardCount(n))
}

/// Indices of every maximal element. Ties return more than one index;
/// an empty slice returns none.
pub fn argmax<T: Ord>(items: &[T]) -> Vec<usize> {
    let Some(max) = items.iter().max() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| *item == max)
        .map(|(i, _)| i)
        .collect()
}
