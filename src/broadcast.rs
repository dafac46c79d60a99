use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// How often idle sessions are looked for
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a background task that removes sessions idle for longer than `ttl`.
///
/// Members of a removed session receive `session_closed`.
pub fn spawn_session_sweeper(state: Arc<AppState>, ttl: Duration) {
    let ttl = match chrono::Duration::from_std(ttl) {
        Ok(ttl) => ttl,
        Err(e) => {
            tracing::warn!("Session idle time out of range, sweeper disabled: {}", e);
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SWEEP_INTERVAL).await;

            let removed = state.sweep_idle_sessions(ttl).await;
            if !removed.is_empty() {
                tracing::info!(count = removed.len(), "Swept idle sessions");
            }
        }
    });
}
