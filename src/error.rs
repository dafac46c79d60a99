//! Error types for session operations

use crate::types::SessionCode;

/// Errors returned by session and voting operations.
///
/// Each variant has a stable wire code sent to clients in `error` messages.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PokerError {
    #[error("Session {0} not found")]
    SessionNotFound(SessionCode),

    #[error("Please enter a session code")]
    EmptyCode,

    #[error("You are not part of a session")]
    NotInSession,

    #[error("You are not a player in session {0}")]
    NotAMember(SessionCode),

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("Please enter your name")]
    EmptyName,

    #[error("Please enter a ticket number")]
    EmptyTicket,

    #[error("Voting is already active for ticket: {0}")]
    VotingActive(String),

    #[error("No active voting session")]
    NoActiveTicket,

    #[error("Votes have already been revealed")]
    AlreadyRevealed,

    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("No votes have been cast yet")]
    NoVotes,
}

impl PokerError {
    /// Wire code for `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            PokerError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            PokerError::EmptyCode => "EMPTY_CODE",
            PokerError::NotInSession => "NOT_IN_SESSION",
            PokerError::NotAMember(_) => "NOT_A_MEMBER",
            PokerError::NotHost(_) => "NOT_HOST",
            PokerError::EmptyName => "EMPTY_NAME",
            PokerError::EmptyTicket => "EMPTY_TICKET",
            PokerError::VotingActive(_) => "VOTING_ACTIVE",
            PokerError::NoActiveTicket => "NO_ACTIVE_TICKET",
            PokerError::AlreadyRevealed => "ALREADY_REVEALED",
            PokerError::InvalidCard(_) => "INVALID_CARD",
            PokerError::NoVotes => "NO_VOTES",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_messages() {
        let err = PokerError::VotingActive("PROJ-1".to_string());
        assert_eq!(err.code(), "VOTING_ACTIVE");
        assert_eq!(err.to_string(), "Voting is already active for ticket: PROJ-1");

        let err = PokerError::NotHost("reveal votes");
        assert_eq!(err.code(), "NOT_HOST");
        assert_eq!(err.to_string(), "Only the host can reveal votes");
    }
}
