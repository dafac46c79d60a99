pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{PlayerId, SessionCode};

/// Longest player ID accepted from a client
const MAX_PLAYER_ID_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub player_id: Option<String>,
    pub session: Option<String>,
}

/// Per-socket state: who is talking and which session they are in
#[derive(Debug, Clone)]
pub struct Connection {
    pub player_id: PlayerId,
    pub session: Option<SessionCode>,
    /// Session code from the `session` query parameter, used by an empty join
    pub requested_session: Option<SessionCode>,
}

impl Connection {
    pub fn new(player_id: PlayerId, requested_session: Option<SessionCode>) -> Self {
        Self {
            player_id,
            session: None,
            requested_session,
        }
    }
}

/// Keep a client-chosen player ID if it looks sane, otherwise mint one
fn resolve_player_id(requested: Option<String>) -> PlayerId {
    requested
        .map(|id| id.trim().to_string())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_PLAYER_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: player_id={:?}, session={:?}",
        params.player_id,
        params.session
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), ()> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            return Ok(());
        }
    };
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Broadcast feed of the session a connection is currently in
#[derive(Default)]
struct SessionFeed {
    code: Option<SessionCode>,
    rx: Option<broadcast::Receiver<ServerMessage>>,
}

impl SessionFeed {
    /// Re-subscribe if the connection moved to another session (or left)
    async fn follow(&mut self, state: &AppState, session: Option<&SessionCode>) {
        if self.code.as_ref() == session {
            return;
        }
        self.rx = match session {
            Some(code) => Some(state.subscribe(code).await),
            None => None,
        };
        self.code = session.cloned();
    }

    /// Wait for the next broadcast, or forever when not in a session
    async fn recv(&mut self) -> Result<ServerMessage, RecvError> {
        match &mut self.rx {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    fn close(&mut self) {
        self.code = None;
        self.rx = None;
    }
}

/// Turn a session broadcast into what this connection should be sent
async fn on_broadcast(
    received: Result<ServerMessage, RecvError>,
    conn: &mut Connection,
    feed: &mut SessionFeed,
    state: &AppState,
) -> Option<ServerMessage> {
    match received {
        Ok(msg) => {
            if let ServerMessage::SessionClosed { code } = &msg {
                if conn.session.as_ref() == Some(code) {
                    conn.session = None;
                    feed.close();
                }
            }
            Some(msg)
        }
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "Session broadcast lagged, resending state");
            let code = conn.session.as_ref()?;
            state
                .session_view(code)
                .await
                .map(|view| ServerMessage::SessionState { view })
        }
        Err(RecvError::Closed) => {
            feed.close();
            None
        }
    }
}

/// Parse and handle one text frame from the client
async fn on_text(text: &str, conn: &mut Connection, state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::debug!("Received message: {}", text);

    match serde_json::from_str::<ClientMessage>(text) {
        Ok(client_msg) => handlers::handle_message(client_msg, conn, state).await,
        Err(e) => {
            tracing::warn!("Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                msg: format!("Invalid message format: {}", e),
            })
        }
    }
}

enum Event {
    Broadcast(Result<ServerMessage, RecvError>),
    Client(Option<Result<Message, axum::Error>>),
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let requested_session = params
        .session
        .map(|code| crate::state::normalize_code(&code))
        .filter(|code| !code.is_empty());
    let mut conn = Connection::new(resolve_player_id(params.player_id), requested_session);

    tracing::info!(player = %conn.player_id, "WebSocket connected");

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        player_id: conn.player_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
        suggested_session: conn.requested_session.clone(),
    };
    if send_message(&mut sender, &welcome).await.is_err() {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut feed = SessionFeed::default();

    loop {
        let event = tokio::select! {
            msg = feed.recv() => Event::Broadcast(msg),
            msg = receiver.next() => Event::Client(msg),
        };

        match event {
            Event::Broadcast(received) => {
                if let Some(msg) = on_broadcast(received, &mut conn, &mut feed, &state).await {
                    if send_message(&mut sender, &msg).await.is_err() {
                        break;
                    }
                }
            }
            Event::Client(Some(Ok(Message::Text(text)))) => {
                let response = on_text(text.as_str(), &mut conn, &state).await;
                // Subscribe before answering so no update after the join is missed
                feed.follow(&state, conn.session.as_ref()).await;

                if let Some(response) = response {
                    if send_message(&mut sender, &response).await.is_err() {
                        tracing::error!("Failed to send response");
                        break;
                    }
                }
            }
            Event::Client(Some(Ok(Message::Close(_)))) => {
                tracing::info!("WebSocket closed");
                break;
            }
            Event::Client(Some(Ok(Message::Ping(data)))) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Event::Client(Some(Ok(_))) => {}
            Event::Client(Some(Err(e))) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            Event::Client(None) => break,
        }
    }

    // Players stay listed after a disconnect so a reload can pick up where it left off
    tracing::info!(
        player = %conn.player_id,
        session = ?conn.session,
        "WebSocket connection closed"
    );
}
