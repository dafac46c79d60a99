use crate::error::PokerError;
use crate::estimate::Results;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new session with the sender as host
    CreateSession {
        name: String,
    },
    /// Join an existing session. An empty code falls back to the `session`
    /// query parameter the socket was opened with
    JoinSession {
        #[serde(default)]
        code: String,
        name: String,
    },
    Rename {
        name: String,
    },
    LeaveSession,
    CastVote {
        card: Card,
    },
    // Host-only messages
    StartVoting {
        ticket: String,
    },
    /// Reveal all votes. `confirm` is required when nobody voted yet
    StopVoting {
        #[serde(default)]
        confirm: bool,
    },
    Reset {
        #[serde(default)]
        confirm: bool,
    },
    ClearHistory,
    GetHistory,
}

/// Action awaiting user confirmation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmAction {
    StopVoting,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        player_id: PlayerId,
        server_now: String,
        /// Session code the socket was opened with, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        suggested_session: Option<SessionCode>,
    },
    SessionJoined {
        code: SessionCode,
        is_host: bool,
        view: SessionView,
    },
    /// Broadcast to all members whenever the session changes
    SessionState {
        view: SessionView,
    },
    VoteAck {
        card: Card,
    },
    History {
        items: Vec<HistoryItem>,
    },
    /// Sent instead of performing a reveal/reset that would act on zero votes
    ConfirmationRequired {
        action: ConfirmAction,
        msg: String,
    },
    SessionLeft,
    /// The session was dropped (idle sweep or state import)
    SessionClosed {
        code: SessionCode,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<PokerError> for ServerMessage {
    fn from(err: PokerError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

/// A player row as clients render it.
///
/// `vote` stays `None` until the session is revealed, so a card never
/// leaves the server before everyone sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub has_voted: bool,
    pub vote: Option<Card>,
}

/// Everything a client needs to redraw a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub code: SessionCode,
    pub host_id: PlayerId,
    pub active_ticket: Option<String>,
    pub revealed: bool,
    pub phase: VotingPhase,
    pub players: Vec<PlayerView>,
    /// Present only once revealed and at least one numeric vote exists
    pub results: Option<Results>,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        let players = s
            .players
            .values()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                has_voted: p.vote.is_some(),
                vote: if s.revealed { p.vote } else { None },
            })
            .collect();

        let results = if s.revealed {
            Results::from_cards(s.votes())
        } else {
            None
        };

        Self {
            code: s.code.clone(),
            host_id: s.host_id.clone(),
            active_ticket: s.active_ticket.clone(),
            revealed: s.revealed,
            phase: s.phase(),
            players,
            results,
        }
    }
}
