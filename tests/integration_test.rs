use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use pointpoker::protocol::{ClientMessage, ConfirmAction, ServerMessage};
use pointpoker::state::AppState;
use pointpoker::store::{FileStore, Store};
use pointpoker::types::{Card, HistoryStatus, VotingPhase};
use pointpoker::ws::handlers::handle_message;
use pointpoker::ws::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

fn connection(player_id: &str) -> Connection {
    Connection::new(player_id.to_string(), None)
}

async fn send(state: &Arc<AppState>, conn: &mut Connection, msg: ClientMessage) -> Option<ServerMessage> {
    handle_message(msg, conn, state).await
}

/// End-to-end test for a complete estimation round
#[tokio::test]
async fn test_full_estimation_flow() {
    let state = Arc::new(AppState::new());
    let mut alice = connection("alice");
    let mut bob = connection("bob");
    let mut carol = connection("carol");

    // 1. Alice creates a session and becomes host
    let code = match send(
        &state,
        &mut alice,
        ClientMessage::CreateSession {
            name: "Alice".to_string(),
        },
    )
    .await
    {
        Some(ServerMessage::SessionJoined { code, is_host, view }) => {
            assert!(is_host);
            assert_eq!(view.phase, VotingPhase::Idle);
            assert_eq!(view.players.len(), 1);
            code
        }
        other => panic!("Expected SessionJoined, got {:?}", other),
    };
    assert_eq!(code.len(), 6);

    // 2. Bob and Carol join, Bob with a lowercase code
    for (conn, name, join_code) in [
        (&mut bob, "Bob", code.to_lowercase()),
        (&mut carol, "Carol", code.clone()),
    ] {
        match send(
            &state,
            conn,
            ClientMessage::JoinSession {
                code: join_code,
                name: name.to_string(),
            },
        )
        .await
        {
            Some(ServerMessage::SessionJoined { is_host, .. }) => assert!(!is_host),
            other => panic!("Expected SessionJoined, got {:?}", other),
        }
    }

    let mut rx = state.subscribe(&code).await;

    // 3. Voting before a ticket is rejected
    match send(&state, &mut bob, ClientMessage::CastVote { card: Card::Points(5) }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NO_ACTIVE_TICKET"),
        other => panic!("Expected Error, got {:?}", other),
    }

    // 4. Host starts voting
    let result = send(
        &state,
        &mut alice,
        ClientMessage::StartVoting {
            ticket: "PROJ-42".to_string(),
        },
    )
    .await;
    assert!(result.is_none());

    match rx.recv().await.unwrap() {
        ServerMessage::SessionState { view } => {
            assert_eq!(view.phase, VotingPhase::Voting);
            assert_eq!(view.active_ticket.as_deref(), Some("PROJ-42"));
        }
        other => panic!("Expected SessionState, got {:?}", other),
    }

    // 5. Everyone votes; votes stay hidden until reveal
    for (conn, card) in [
        (&mut alice, Card::Points(3)),
        (&mut bob, Card::Points(5)),
        (&mut carol, Card::Unsure),
    ] {
        match send(&state, conn, ClientMessage::CastVote { card }).await {
            Some(ServerMessage::VoteAck { card: acked }) => assert_eq!(acked, card),
            other => panic!("Expected VoteAck, got {:?}", other),
        }
    }

    let view = state.session_view(&code).await.unwrap();
    assert!(view.players.iter().all(|p| p.has_voted && p.vote.is_none()));
    assert!(view.results.is_none());

    // 6. A non-host cannot reveal
    match send(&state, &mut bob, ClientMessage::StopVoting { confirm: false }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "NOT_HOST"),
        other => panic!("Expected Error, got {:?}", other),
    }

    // 7. Host reveals
    let result = send(&state, &mut alice, ClientMessage::StopVoting { confirm: false }).await;
    assert!(result.is_none());

    let view = state.session_view(&code).await.unwrap();
    assert_eq!(view.phase, VotingPhase::Revealed);
    let results = view.results.expect("results after reveal");
    assert_eq!(results.average, 4.0);
    // 4.0 is equally far from 3 and 5; the smaller card wins
    assert_eq!(results.suggested, 3);

    // 8. Votes are locked after reveal
    match send(&state, &mut bob, ClientMessage::CastVote { card: Card::Points(8) }).await {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "ALREADY_REVEALED"),
        other => panic!("Expected Error, got {:?}", other),
    }

    // 9. History records the round, including the unsure vote
    match send(&state, &mut carol, ClientMessage::GetHistory).await {
        Some(ServerMessage::History { items }) => {
            assert_eq!(items.len(), 1);
            let item = &items[0];
            assert_eq!(item.ticket_number, "PROJ-42");
            assert_eq!(item.players.len(), 3);
            assert_eq!(item.average, 4.0);
            assert_eq!(item.suggested, 3);
            assert_eq!(item.status, HistoryStatus::Completed);
        }
        other => panic!("Expected History, got {:?}", other),
    }

    // 10. Reset clears the table for the next ticket
    let result = send(&state, &mut alice, ClientMessage::Reset { confirm: false }).await;
    assert!(result.is_none());

    let session = state.get_session(&code).await.unwrap();
    assert_eq!(session.phase(), VotingPhase::Idle);
    assert!(session.active_ticket.is_none());
    assert!(session.players.values().all(|p| p.vote.is_none()));
    assert_eq!(state.get_history(&code).await.len(), 1);
}

#[tokio::test]
async fn test_reveal_without_votes_needs_confirmation() {
    let state = Arc::new(AppState::new());
    let mut host = connection("host");
    send(
        &state,
        &mut host,
        ClientMessage::CreateSession {
            name: "Alice".to_string(),
        },
    )
    .await;
    send(
        &state,
        &mut host,
        ClientMessage::StartVoting {
            ticket: "T-1".to_string(),
        },
    )
    .await;

    // Only an unsure vote: still counts as no votes
    send(&state, &mut host, ClientMessage::CastVote { card: Card::Unsure }).await;

    match send(&state, &mut host, ClientMessage::StopVoting { confirm: false }).await {
        Some(ServerMessage::ConfirmationRequired { action, .. }) => {
            assert_eq!(action, ConfirmAction::StopVoting)
        }
        other => panic!("Expected ConfirmationRequired, got {:?}", other),
    }

    assert!(send(&state, &mut host, ClientMessage::StopVoting { confirm: true })
        .await
        .is_none());

    let code = host.session.clone().unwrap();
    let history = state.get_history(&code).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].average, 0.0);
    assert_eq!(history[0].suggested, 0);
    assert_eq!(history[0].players.len(), 1);
}

#[tokio::test]
async fn test_history_is_capped() {
    let state = Arc::new(AppState::new());
    let mut host = connection("host");
    send(
        &state,
        &mut host,
        ClientMessage::CreateSession {
            name: "Alice".to_string(),
        },
    )
    .await;
    let code = host.session.clone().unwrap();

    for i in 0..25 {
        send(
            &state,
            &mut host,
            ClientMessage::StartVoting {
                ticket: format!("T-{}", i),
            },
        )
        .await;
        send(&state, &mut host, ClientMessage::CastVote { card: Card::Points(2) }).await;
        send(&state, &mut host, ClientMessage::StopVoting { confirm: false }).await;
    }

    let history = state.get_history(&code).await;
    assert_eq!(history.len(), 20);
    assert_eq!(history[0].ticket_number, "T-24");
    assert_eq!(history[19].ticket_number, "T-5");
}

#[tokio::test]
async fn test_sessions_survive_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("poker.json");

    let code = {
        let store: Arc<dyn Store> = Arc::new(FileStore::open(&path).await.unwrap());
        let state = Arc::new(AppState::with_store(store, 20));
        let mut host = connection("host");
        send(
            &state,
            &mut host,
            ClientMessage::CreateSession {
                name: "Alice".to_string(),
            },
        )
        .await;
        send(
            &state,
            &mut host,
            ClientMessage::StartVoting {
                ticket: "T-1".to_string(),
            },
        )
        .await;
        send(&state, &mut host, ClientMessage::CastVote { card: Card::Points(8) }).await;
        send(&state, &mut host, ClientMessage::StopVoting { confirm: false }).await;
        host.session.clone().unwrap()
    };

    let store: Arc<dyn Store> = Arc::new(FileStore::open(&path).await.unwrap());
    let state = AppState::with_store(store, 20);
    assert_eq!(state.restore_from_store().await.unwrap(), 1);

    let session = state.get_session(&code).await.unwrap();
    assert!(session.revealed);
    assert_eq!(session.players["host"].vote, Some(Card::Points(8)));
    assert_eq!(state.get_history(&code).await.len(), 1);
}

#[tokio::test]
async fn test_api_health() {
    let state = Arc::new(AppState::new());
    let app = pointpoker::app(state, "static");

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory");
}

#[tokio::test]
async fn test_api_session_lookup() {
    let state = Arc::new(AppState::new());
    let session = state.create_session("host", "Alice").await.unwrap();
    let app = pointpoker::app(state, "static");

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/api/sessions/{}", session.code.to_lowercase()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], session.code.as_str());

    let response = app
        .oneshot(
            Request::get("/api/sessions/NOPE99/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_rejects_invalid_import() {
    let state = Arc::new(AppState::new());
    let app = pointpoker::app(state, "static");

    let body = serde_json::json!({
        "schema_version": 99,
        "exported_at": "2026-01-01T00:00:00Z",
        "sessions": {},
        "histories": {}
    });
    let response = app
        .oneshot(
            Request::post("/api/state/import")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn serve(state: Arc<AppState>) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = pointpoker::app(state, "static");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn open_socket(addr: std::net::SocketAddr, player_id: &str) -> Socket {
    let url = format!("ws://{}/ws?player_id={}", addr, player_id);
    let (mut socket, _) = connect_async(url).await.unwrap();
    let welcome = next_json(&mut socket).await;
    assert_eq!(welcome["t"], "welcome");
    assert_eq!(welcome["player_id"], player_id);
    socket
}

async fn send_json(socket: &mut Socket, value: serde_json::Value) {
    socket.send(Message::Text(value.to_string())).await.unwrap();
}

async fn next_json(socket: &mut Socket) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a message")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_websocket_session_lifecycle() {
    let state = Arc::new(AppState::new());
    let addr = serve(state.clone()).await;

    let mut alice = open_socket(addr, "alice").await;
    send_json(&mut alice, serde_json::json!({"t": "create_session", "name": "Alice"})).await;
    let joined = next_json(&mut alice).await;
    assert_eq!(joined["t"], "session_joined");
    assert_eq!(joined["is_host"], true);
    let code = joined["code"].as_str().unwrap().to_string();

    // Bob joins; Alice's socket follows the session and sees him arrive
    let mut bob = open_socket(addr, "bob").await;
    send_json(
        &mut bob,
        serde_json::json!({"t": "join_session", "code": code, "name": "Bob"}),
    )
    .await;
    assert_eq!(next_json(&mut bob).await["t"], "session_joined");

    let update = next_json(&mut alice).await;
    assert_eq!(update["t"], "session_state");
    assert_eq!(update["view"]["players"].as_array().unwrap().len(), 2);

    // Garbage gets a parse error and the socket stays usable
    bob.send(Message::Text("{oops".to_string())).await.unwrap();
    let error = next_json(&mut bob).await;
    assert_eq!(error["t"], "error");
    assert_eq!(error["code"], "PARSE_ERROR");

    // Removing the session closes it for every member
    state.remove_session(&code).await;
    for socket in [&mut alice, &mut bob] {
        let closed = next_json(socket).await;
        assert_eq!(closed["t"], "session_closed");
        assert_eq!(closed["code"], code.as_str());
    }

    send_json(&mut bob, serde_json::json!({"t": "cast_vote", "card": "5"})).await;
    let error = next_json(&mut bob).await;
    assert_eq!(error["code"], "NOT_IN_SESSION");
}

#[tokio::test]
async fn test_reconnected_socket_rejoins_as_host() {
    let state = Arc::new(AppState::new());
    let addr = serve(state.clone()).await;

    let mut first = open_socket(addr, "alice").await;
    send_json(&mut first, serde_json::json!({"t": "create_session", "name": "Alice"})).await;
    let code = next_json(&mut first).await["code"]
        .as_str()
        .unwrap()
        .to_string();
    first.close(None).await.unwrap();

    // The new socket starts outside any session until it joins again
    let url = format!("ws://{}/ws?player_id=alice&session={}", addr, code.to_lowercase());
    let (mut second, _) = connect_async(url).await.unwrap();
    let welcome = next_json(&mut second).await;
    assert_eq!(welcome["suggested_session"], code.as_str());

    send_json(&mut second, serde_json::json!({"t": "cast_vote", "card": "3"})).await;
    assert_eq!(next_json(&mut second).await["code"], "NOT_IN_SESSION");

    send_json(
        &mut second,
        serde_json::json!({"t": "join_session", "code": code, "name": "Alice"}),
    )
    .await;
    let joined = next_json(&mut second).await;
    assert_eq!(joined["t"], "session_joined");
    assert_eq!(joined["is_host"], true);
    assert_eq!(state.get_session(&code).await.unwrap().players.len(), 1);
}
