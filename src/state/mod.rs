pub mod export;
mod history;
mod persist;
mod session;
mod vote;

use crate::error::PokerError;
use crate::protocol::{ServerMessage, SessionView};
use crate::store::{MemoryStore, Store};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};

pub use session::{generate_session_code, normalize_code};

/// Maximum number of history entries kept per session
pub const HISTORY_LIMIT: usize = 20;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<SessionCode, Session>>>,
    /// Ticket history per session, newest first
    pub histories: Arc<RwLock<HashMap<SessionCode, Vec<HistoryItem>>>>,
    /// Per-session broadcast channels, created on first subscription
    channels: Arc<RwLock<HashMap<SessionCode, broadcast::Sender<ServerMessage>>>>,
    /// Held from mutation until the snapshot is persisted and broadcast, so
    /// writes for one session reach the store and subscribers in order
    commit_locks: Arc<Mutex<HashMap<SessionCode, Arc<Mutex<()>>>>>,
    pub store: Arc<dyn Store>,
    pub history_limit: usize,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), HISTORY_LIMIT)
    }

    pub fn with_store(store: Arc<dyn Store>, history_limit: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            histories: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            commit_locks: Arc::new(Mutex::new(HashMap::new())),
            store,
            history_limit: history_limit.clamp(1, HISTORY_LIMIT),
        }
    }

    /// Subscribe to updates for a session
    pub async fn subscribe(&self, code: &str) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(code.to_string())
            .or_insert_with(|| broadcast::channel(100).0)
            .subscribe()
    }

    /// Send a message to everyone subscribed to a session
    pub async fn broadcast_to_session(&self, code: &str, msg: ServerMessage) {
        if let Some(tx) = self.channels.read().await.get(code) {
            // Ignore send errors (no receivers connected is fine)
            let _ = tx.send(msg);
        }
    }

    /// Broadcast the current view of a session to its members
    pub async fn broadcast_session_state(&self, code: &str) {
        if let Some(view) = self.session_view(code).await {
            self.broadcast_to_session(code, ServerMessage::SessionState { view })
                .await;
        }
    }

    /// Tell subscribers the session is gone and drop its channel
    async fn close_channel(&self, code: &str) {
        if let Some(tx) = self.channels.write().await.remove(code) {
            let _ = tx.send(ServerMessage::SessionClosed {
                code: code.to_string(),
            });
        }
    }

    pub async fn session_view(&self, code: &str) -> Option<SessionView> {
        self.sessions
            .read()
            .await
            .get(code)
            .map(SessionView::from)
    }

    /// Serialize commits for one session
    async fn commit_guard(&self, code: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .commit_locks
            .lock()
            .await
            .entry(code.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn forget_commit_lock(&self, code: &str) {
        self.commit_locks.lock().await.remove(code);
    }

    /// Apply `f` to a session under the write lock, then persist and broadcast.
    ///
    /// Nothing is persisted or broadcast when `f` fails.
    async fn mutate_session<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Session) -> Result<T, PokerError>,
    ) -> Result<(T, Session), PokerError> {
        let _commit = self.commit_guard(code).await;
        self.mutate_committed(code, f).await
    }

    /// Same as `mutate_session`, for callers already holding the commit guard
    async fn mutate_committed<T>(
        &self,
        code: &str,
        f: impl FnOnce(&mut Session) -> Result<T, PokerError>,
    ) -> Result<(T, Session), PokerError> {
        let (out, snapshot) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(code)
                .ok_or_else(|| PokerError::SessionNotFound(code.to_string()))?;
            let out = f(session)?;
            session.touch();
            (out, session.clone())
        };

        self.persist_session(&snapshot).await;
        self.broadcast_to_session(
            code,
            ServerMessage::SessionState {
                view: SessionView::from(&snapshot),
            },
        )
        .await;

        Ok((out, snapshot))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Fail with `NotHost` unless `player_id` hosts the session
fn ensure_host(session: &Session, player_id: &str, action: &'static str) -> Result<(), PokerError> {
    if session.is_host(player_id) {
        Ok(())
    } else {
        Err(PokerError::NotHost(action))
    }
}
