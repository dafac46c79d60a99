//! WebSocket message dispatch
//!
//! Membership is checked here, then messages are dispatched to the player or
//! host handler modules. Host rights are enforced by the state layer, which
//! knows who hosts each session.

use crate::error::PokerError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

use super::{host, player, Connection};

/// Resolve the connection's session or return `NOT_IN_SESSION` early
macro_rules! require_session {
    ($conn:expr) => {
        match $conn.session.clone() {
            Some(code) => code,
            None => return Some(PokerError::NotInSession.into()),
        }
    };
}

/// Handle a client message and return an optional direct response.
///
/// Session-wide updates are broadcast separately; the response only carries
/// what the sender alone needs to see.
pub async fn handle_message(
    msg: ClientMessage,
    conn: &mut Connection,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateSession { name } => {
            player::handle_create_session(state, conn, name).await
        }

        ClientMessage::JoinSession { code, name } => {
            player::handle_join_session(state, conn, code, name).await
        }

        ClientMessage::Rename { name } => {
            let code = require_session!(conn);
            player::handle_rename(state, conn, &code, name).await
        }

        ClientMessage::LeaveSession => {
            let code = require_session!(conn);
            player::handle_leave_session(state, conn, &code).await
        }

        ClientMessage::CastVote { card } => {
            let code = require_session!(conn);
            player::handle_cast_vote(state, conn, &code, card).await
        }

        ClientMessage::GetHistory => {
            let code = require_session!(conn);
            Some(ServerMessage::History {
                items: state.get_history(&code).await,
            })
        }

        // Host commands
        ClientMessage::StartVoting { ticket } => {
            let code = require_session!(conn);
            host::handle_start_voting(state, conn, &code, ticket).await
        }

        ClientMessage::StopVoting { confirm } => {
            let code = require_session!(conn);
            host::handle_stop_voting(state, conn, &code, confirm).await
        }

        ClientMessage::Reset { confirm } => {
            let code = require_session!(conn);
            host::handle_reset(state, conn, &code, confirm).await
        }

        ClientMessage::ClearHistory => {
            let code = require_session!(conn);
            host::handle_clear_history(state, conn, &code).await
        }
    }
}
