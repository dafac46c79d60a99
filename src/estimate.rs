//! Vote aggregation: average, nearest-point suggestion and distribution.

use crate::types::{Card, CARD_POINTS};
use serde::{Deserialize, Serialize};

/// How many players picked a given card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteCount {
    pub points: u32,
    pub count: u32,
}

/// Results shown after votes are revealed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Results {
    pub average: f64,
    pub suggested: u32,
    /// Numeric votes only, most popular first
    pub distribution: Vec<VoteCount>,
}

/// Suggest the deck value closest to `average`.
///
/// Equidistant candidates resolve to the smaller value (4.0 suggests 3).
pub fn suggest_points(average: f64) -> u32 {
    CARD_POINTS.iter().copied().fold(CARD_POINTS[0], |prev, curr| {
        if (curr as f64 - average).abs() < (prev as f64 - average).abs() {
            curr
        } else {
            prev
        }
    })
}

/// Numeric values of the given cards, skipping "?"
pub fn numeric_votes<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Vec<u32> {
    cards.into_iter().filter_map(Card::points).collect()
}

/// Mean of the numeric votes, `None` if there are none
pub fn average(votes: &[u32]) -> Option<f64> {
    if votes.is_empty() {
        return None;
    }
    let sum: u32 = votes.iter().sum();
    Some(sum as f64 / votes.len() as f64)
}

/// Count votes per card value, sorted by count descending then value ascending
pub fn distribution(votes: &[u32]) -> Vec<VoteCount> {
    let mut counts: Vec<VoteCount> = Vec::new();
    for &points in votes {
        match counts.iter_mut().find(|c| c.points == points) {
            Some(c) => c.count += 1,
            None => counts.push(VoteCount { points, count: 1 }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.points.cmp(&b.points)));
    counts
}

impl Results {
    /// Compute results for a set of cards, `None` if nobody put down a number
    pub fn from_cards<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Option<Self> {
        let votes = numeric_votes(cards);
        let average = average(&votes)?;
        Some(Self {
            average,
            suggested: suggest_points(average),
            distribution: distribution(&votes),
        })
    }
}
