use crate::error::PokerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for readability
pub type PlayerId = String;
pub type SessionCode = String;

/// Numeric card values in the deck, ascending
pub const CARD_POINTS: [u32; 7] = [1, 2, 3, 5, 8, 13, 21];

/// A card a player can put down.
///
/// On the wire and in snapshots a card is a plain string (`"5"`, `"?"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Card {
    Points(u32),
    /// The "?" card: the player can't estimate this ticket
    Unsure,
}

impl Card {
    /// Numeric value of the card, `None` for "?"
    pub fn points(&self) -> Option<u32> {
        match self {
            Card::Points(p) => Some(*p),
            Card::Unsure => None,
        }
    }
}

impl FromStr for Card {
    type Err = PokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "?" {
            return Ok(Card::Unsure);
        }
        match s.parse::<u32>() {
            Ok(p) if CARD_POINTS.contains(&p) => Ok(Card::Points(p)),
            _ => Err(PokerError::InvalidCard(s.to_string())),
        }
    }
}

impl TryFrom<String> for Card {
    type Error = PokerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Points(p) => write!(f, "{}", p),
            Card::Unsure => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub vote: Option<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub code: SessionCode,
    pub host_id: PlayerId,
    pub active_ticket: Option<String>,
    pub revealed: bool,
    /// Keyed by player ID
    pub players: BTreeMap<PlayerId, Player>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Where a session is in its estimation cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VotingPhase {
    Idle,
    Voting,
    Revealed,
}

impl Session {
    pub fn new(code: SessionCode, host: Player) -> Self {
        let now = Utc::now();
        let mut players = BTreeMap::new();
        let host_id = host.id.clone();
        players.insert(host.id.clone(), host);
        Self {
            code,
            host_id,
            active_ticket: None,
            revealed: false,
            players,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn phase(&self) -> VotingPhase {
        match (&self.active_ticket, self.revealed) {
            (None, _) => VotingPhase::Idle,
            (Some(_), false) => VotingPhase::Voting,
            (Some(_), true) => VotingPhase::Revealed,
        }
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id == player_id
    }

    pub fn votes(&self) -> impl Iterator<Item = &Card> {
        self.players.values().filter_map(|p| p.vote.as_ref())
    }

    /// Whether at least one player put down a numeric card
    pub fn has_numeric_votes(&self) -> bool {
        self.votes().any(|c| c.points().is_some())
    }

    pub fn clear_votes(&mut self) {
        for player in self.players.values_mut() {
            player.vote = None;
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Completed,
}

/// A single player's card as recorded in history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryVote {
    pub name: String,
    pub vote: Card,
}

/// One finished estimation, as stored in a session's ticket history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub ticket_number: String,
    pub players: Vec<HistoryVote>,
    pub average: f64,
    pub suggested: u32,
    pub timestamp: String,
    pub status: HistoryStatus,
}
