use super::{ensure_host, AppState};
use crate::error::PokerError;
use crate::estimate::{average, numeric_votes, suggest_points};
use crate::types::*;

/// Snapshot the active ticket of a session as a finished history entry.
///
/// Players without a card are left out; "?" cards are kept in the snapshot
/// but don't count towards the average.
pub(super) fn history_item_for(session: &Session) -> Option<HistoryItem> {
    let ticket = session.active_ticket.clone()?;

    let votes = numeric_votes(session.votes());
    let (average, suggested) = match average(&votes) {
        Some(avg) => (avg, suggest_points(avg)),
        None => (0.0, 0),
    };

    let players = session
        .players
        .values()
        .filter_map(|p| {
            p.vote.map(|vote| HistoryVote {
                name: p.name.clone(),
                vote,
            })
        })
        .collect();

    Some(HistoryItem {
        ticket_number: ticket,
        players,
        average,
        suggested,
        timestamp: chrono::Utc::now().to_rfc3339(),
        status: HistoryStatus::Completed,
    })
}

impl AppState {
    /// Prepend an entry to a session's history, dropping the oldest beyond the limit.
    ///
    /// Ignored when the session no longer exists.
    pub async fn record_history(&self, code: &str, item: HistoryItem) {
        let snapshot = {
            let sessions = self.sessions.read().await;
            if !sessions.contains_key(code) {
                tracing::debug!(code = %code, "Session gone, history entry dropped");
                return;
            }
            let mut histories = self.histories.write().await;
            let history = histories.entry(code.to_string()).or_default();
            history.insert(0, item);
            history.truncate(self.history_limit);
            history.clone()
        };
        self.persist_history(code, &snapshot).await;
    }

    /// History for a session, newest first
    pub async fn get_history(&self, code: &str) -> Vec<HistoryItem> {
        self.histories
            .read()
            .await
            .get(code)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn clear_history(&self, code: &str, player_id: &str) -> Result<(), PokerError> {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(code)
                .ok_or_else(|| PokerError::SessionNotFound(code.to_string()))?;
            ensure_host(session, player_id, "clear history")?;
        }

        self.histories.write().await.remove(code);
        self.persist_history(code, &[]).await;
        tracing::info!(code = %code, "History cleared");
        Ok(())
    }
}
