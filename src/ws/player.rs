//! Player message handlers
//!
//! Joining, leaving, renaming and voting.

use crate::error::PokerError;
use crate::protocol::{ServerMessage, SessionView};
use crate::state::AppState;
use crate::types::{Card, Session};
use std::sync::Arc;

use super::Connection;

fn joined(conn: &mut Connection, session: &Session) -> ServerMessage {
    conn.session = Some(session.code.clone());
    ServerMessage::SessionJoined {
        code: session.code.clone(),
        is_host: session.is_host(&conn.player_id),
        view: SessionView::from(session),
    }
}

/// Leave the current session, if any, before switching to another one
async fn leave_current(state: &Arc<AppState>, conn: &mut Connection) {
    if let Some(code) = conn.session.take() {
        if let Err(e) = state.leave_session(&code, &conn.player_id).await {
            tracing::debug!(code = %code, "Leaving previous session failed: {}", e);
        }
    }
}

pub async fn handle_create_session(
    state: &Arc<AppState>,
    conn: &mut Connection,
    name: String,
) -> Option<ServerMessage> {
    tracing::info!(player = %conn.player_id, "Creating session");
    leave_current(state, conn).await;

    match state.create_session(&conn.player_id, &name).await {
        Ok(session) => Some(joined(conn, &session)),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_join_session(
    state: &Arc<AppState>,
    conn: &mut Connection,
    code: String,
    name: String,
) -> Option<ServerMessage> {
    let code = if code.trim().is_empty() {
        match conn.requested_session.clone() {
            Some(code) => code,
            None => return Some(PokerError::EmptyCode.into()),
        }
    } else {
        code
    };
    let code = crate::state::normalize_code(&code);
    tracing::info!(player = %conn.player_id, code = %code, "Join request");

    if state.get_session(&code).await.is_none() {
        return Some(PokerError::SessionNotFound(code).into());
    }
    if conn.session.as_deref() != Some(code.as_str()) {
        leave_current(state, conn).await;
    }

    match state.join_session(&code, &conn.player_id, &name).await {
        Ok(session) => Some(joined(conn, &session)),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_rename(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
    name: String,
) -> Option<ServerMessage> {
    match state.rename_player(code, &conn.player_id, &name).await {
        Ok(_) => None,
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_leave_session(
    state: &Arc<AppState>,
    conn: &mut Connection,
    code: &str,
) -> Option<ServerMessage> {
    conn.session = None;
    match state.leave_session(code, &conn.player_id).await {
        Ok(_) => Some(ServerMessage::SessionLeft),
        // The session may have been swept already; the client is out either way
        Err(PokerError::SessionNotFound(_)) => Some(ServerMessage::SessionLeft),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_cast_vote(
    state: &Arc<AppState>,
    conn: &Connection,
    code: &str,
    card: Card,
) -> Option<ServerMessage> {
    match state.cast_vote(code, &conn.player_id, card).await {
        Ok(card) => Some(ServerMessage::VoteAck { card }),
        Err(e) => Some(e.into()),
    }
}
