//! State export/import for backups and moving a running board between hosts.

use super::{AppState, HISTORY_LIMIT};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of all sessions and their history.
///
/// Broadcast channels are runtime-only and not part of the export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub sessions: HashMap<SessionCode, Session>,
    #[serde(default)]
    pub histories: HashMap<SessionCode, Vec<HistoryItem>>,
}

impl StateExport {
    pub fn new(
        sessions: HashMap<SessionCode, Session>,
        histories: HashMap<SessionCode, Vec<HistoryItem>>,
    ) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            sessions,
            histories,
        }
    }

    /// Validate the export before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        for (code, session) in &self.sessions {
            if *code != session.code {
                return Err(format!(
                    "Session stored under '{}' has code '{}'",
                    code, session.code
                ));
            }
            for (id, player) in &session.players {
                if *id != player.id {
                    return Err(format!(
                        "Player stored under '{}' in session '{}' has id '{}'",
                        id, code, player.id
                    ));
                }
            }
            if session.active_ticket.is_none() && session.revealed {
                return Err(format!(
                    "Session '{}' is revealed without an active ticket",
                    code
                ));
            }
            if session.active_ticket.is_none() && session.votes().next().is_some() {
                return Err(format!("Session '{}' has votes without a ticket", code));
            }
        }

        for (code, history) in &self.histories {
            if !self.sessions.contains_key(code) {
                return Err(format!(
                    "History references session '{}' which doesn't exist",
                    code
                ));
            }
            if history.len() > HISTORY_LIMIT {
                return Err(format!(
                    "History for session '{}' has {} entries, limit is {}",
                    code,
                    history.len(),
                    HISTORY_LIMIT
                ));
            }
        }

        Ok(())
    }
}

impl AppState {
    pub async fn export_state(&self) -> StateExport {
        let sessions = self.sessions.read().await.clone();
        let histories = self.histories.read().await.clone();
        StateExport::new(sessions, histories)
    }

    /// Replace all sessions and history with an export.
    ///
    /// Members of sessions that no longer exist get `session_closed`; the
    /// rest get a fresh `session_state`.
    pub async fn import_state(&self, export: StateExport) -> Result<(), String> {
        export.validate()?;

        let dropped: Vec<SessionCode> = self
            .sessions
            .read()
            .await
            .keys()
            .filter(|code| !export.sessions.contains_key(*code))
            .cloned()
            .collect();
        for code in &dropped {
            self.remove_session(code).await;
        }

        let StateExport {
            sessions,
            mut histories,
            ..
        } = export;
        for history in histories.values_mut() {
            history.truncate(self.history_limit);
        }

        for session in sessions.values() {
            self.persist_session(session).await;
        }
        for code in sessions.keys() {
            let history = histories.get(code).map(Vec::as_slice).unwrap_or_default();
            self.persist_history(code, history).await;
        }

        let codes: Vec<SessionCode> = sessions.keys().cloned().collect();
        *self.sessions.write().await = sessions;
        *self.histories.write().await = histories;

        for code in &codes {
            self.broadcast_session_state(code).await;
        }

        tracing::info!(
            sessions = codes.len(),
            dropped = dropped.len(),
            "State imported"
        );
        Ok(())
    }
}
