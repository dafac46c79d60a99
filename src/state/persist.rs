//! Writing sessions and history through the key-value store.
//!
//! Store failures never fail a session operation: they are logged and the
//! in-memory state stays authoritative.

use super::AppState;
use crate::store::{history_key, session_key, StoreError, HISTORY_KEY_PREFIX, SESSION_KEY_PREFIX};
use crate::types::*;

impl AppState {
    pub(super) async fn persist_session(&self, session: &Session) {
        let result = match serde_json::to_string(session) {
            Ok(json) => self.store.set(&session_key(&session.code), json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::error!(code = %session.code, "Failed to save session: {}", e);
        }
    }

    pub(super) async fn persist_history(&self, code: &str, history: &[HistoryItem]) {
        let key = history_key(code);
        let result = if history.is_empty() {
            self.store.remove(&key).await
        } else {
            match serde_json::to_string(history) {
                Ok(json) => self.store.set(&key, json).await,
                Err(e) => Err(e.into()),
            }
        };
        if let Err(e) = result {
            tracing::error!(code = %code, "Failed to save history: {}", e);
        }
    }

    pub(super) async fn forget_session(&self, code: &str) {
        for key in [session_key(code), history_key(code)] {
            if let Err(e) = self.store.remove(&key).await {
                tracing::error!(key = %key, "Failed to remove from store: {}", e);
            }
        }
    }

    /// Load every session and history found in the store into memory.
    ///
    /// Entries that fail to parse are skipped. Returns the number of sessions restored.
    pub async fn restore_from_store(&self) -> Result<usize, StoreError> {
        let mut restored = 0;

        for key in self.store.keys(SESSION_KEY_PREFIX).await? {
            let Some(json) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Session>(&json) {
                Ok(session) => {
                    self.sessions
                        .write()
                        .await
                        .insert(session.code.clone(), session);
                    restored += 1;
                }
                Err(e) => tracing::warn!(key = %key, "Skipping unreadable session: {}", e),
            }
        }

        for key in self.store.keys(HISTORY_KEY_PREFIX).await? {
            let code = &key[HISTORY_KEY_PREFIX.len()..];
            let Some(json) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Vec<HistoryItem>>(&json) {
                Ok(mut history) => {
                    history.truncate(self.history_limit);
                    self.histories
                        .write()
                        .await
                        .insert(code.to_string(), history);
                }
                Err(e) => tracing::warn!(key = %key, "Skipping unreadable history: {}", e),
            }
        }

        tracing::info!(
            store = self.store.name(),
            sessions = restored,
            "Restored state from store"
        );
        Ok(restored)
    }
}
