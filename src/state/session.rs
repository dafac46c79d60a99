use super::AppState;
use crate::error::PokerError;
use crate::types::*;
use chrono::{Duration, Utc};
use rand::Rng;

/// Safe character set for session codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Generate a random session code (6 characters)
pub fn generate_session_code() -> SessionCode {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trim and upper-case a code typed by a user
pub fn normalize_code(code: &str) -> SessionCode {
    code.trim().to_uppercase()
}

fn normalize_name(name: &str) -> Result<String, PokerError> {
    let name = name.trim();
    if name.is_empty() {
        Err(PokerError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

impl AppState {
    /// Create a session hosted by `player_id`, who joins it immediately
    pub async fn create_session(&self, player_id: &str, name: &str) -> Result<Session, PokerError> {
        let name = normalize_name(name)?;
        let host = Player {
            id: player_id.to_string(),
            name,
            vote: None,
        };

        let session = {
            let mut sessions = self.sessions.write().await;
            // Collisions are rare (~887M codes), just draw again
            let code = loop {
                let code = generate_session_code();
                if !sessions.contains_key(&code) {
                    break code;
                }
            };
            let session = Session::new(code.clone(), host);
            sessions.insert(code, session.clone());
            session
        };

        tracing::info!(code = %session.code, host = %player_id, "Session created");
        self.persist_session(&session).await;
        Ok(session)
    }

    pub async fn get_session(&self, code: &str) -> Option<Session> {
        self.sessions.read().await.get(code).cloned()
    }

    /// Join a session, or re-join it with a cleared vote if already a member
    pub async fn join_session(
        &self,
        code: &str,
        player_id: &str,
        name: &str,
    ) -> Result<Session, PokerError> {
        let code = normalize_code(code);
        let name = normalize_name(name)?;

        let (_, session) = self
            .mutate_session(&code, |session| {
                session.players.insert(
                    player_id.to_string(),
                    Player {
                        id: player_id.to_string(),
                        name,
                        vote: None,
                    },
                );
                Ok(())
            })
            .await?;

        tracing::info!(code = %code, player = %player_id, "Player joined session");
        Ok(session)
    }

    /// Change a member's display name, keeping their vote
    pub async fn rename_player(
        &self,
        code: &str,
        player_id: &str,
        name: &str,
    ) -> Result<Session, PokerError> {
        let name = normalize_name(name)?;
        let (_, session) = self
            .mutate_session(code, |session| match session.players.get_mut(player_id) {
                Some(player) => {
                    player.name = name;
                    Ok(())
                }
                None => Err(PokerError::NotAMember(session.code.clone())),
            })
            .await?;
        Ok(session)
    }

    /// Remove a player. The session itself stays open, even when empty
    pub async fn leave_session(&self, code: &str, player_id: &str) -> Result<Session, PokerError> {
        let (_, session) = self
            .mutate_session(code, |session| {
                session.players.remove(player_id);
                Ok(())
            })
            .await?;

        tracing::info!(code = %code, player = %player_id, "Player left session");
        Ok(session)
    }

    /// Drop a session with its history, from memory and from the store
    pub async fn remove_session(&self, code: &str) -> Option<Session> {
        let _commit = self.commit_guard(code).await;
        let removed = self.sessions.write().await.remove(code);
        self.histories.write().await.remove(code);
        self.forget_session(code).await;
        self.close_channel(code).await;
        self.forget_commit_lock(code).await;
        removed
    }

    /// Remove sessions with no activity for longer than `ttl`
    pub async fn sweep_idle_sessions(&self, ttl: Duration) -> Vec<SessionCode> {
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            tracing::warn!("Idle time of {} is out of range, nothing swept", ttl);
            return Vec::new();
        };
        let idle: Vec<SessionCode> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.last_activity < cutoff)
            .map(|s| s.code.clone())
            .collect();

        for code in &idle {
            self.remove_session(code).await;
            tracing::info!(code = %code, "Removed idle session");
        }
        idle
    }
}
