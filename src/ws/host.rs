//! Host command handlers
//!
//! The state layer rejects these for anyone but the session host.

use crate::error::PokerError;
use crate::protocol::{ConfirmAction, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::Connection;

/// Push the session's history to every member
async fn broadcast_history(state: &Arc<AppState>, code: &str) {
    let items = state.get_history(code).await;
    state
        .broadcast_to_session(code, ServerMessage::History { items })
        .await;
}

pub async fn handle_start_voting(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
    ticket: String,
) -> Option<ServerMessage> {
    match state.start_voting(code, &conn.player_id, &ticket).await {
        Ok(_) => None,
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_stop_voting(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
    confirm: bool,
) -> Option<ServerMessage> {
    match state.stop_voting(code, &conn.player_id, confirm).await {
        Ok(_) => {
            broadcast_history(state, code).await;
            None
        }
        Err(PokerError::NoVotes) => Some(ServerMessage::ConfirmationRequired {
            action: ConfirmAction::StopVoting,
            msg: "No votes have been cast yet. Stop voting anyway?".to_string(),
        }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_reset(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
    confirm: bool,
) -> Option<ServerMessage> {
    match state.reset_voting(code, &conn.player_id, confirm).await {
        Ok(_) => None,
        Err(PokerError::NoVotes) => Some(ServerMessage::ConfirmationRequired {
            action: ConfirmAction::Reset,
            msg: "No votes have been cast yet. Reset anyway?".to_string(),
        }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_clear_history(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
) -> Option<ServerMessage> {
    match state.clear_history(code, &conn.player_id).await {
        Ok(()) => {
            broadcast_history(state, code).await;
            None
        }
        Err(e) => Some(e.into()),
    }
}
