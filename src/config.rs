//! Server configuration from environment variables.
//!
//! `.env` is loaded by `main` before this is read.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::state::HISTORY_LIMIT;

const DEFAULT_BIND: &str = "0.0.0.0:7678";
const DEFAULT_IDLE_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// JSON file backing the store; in-memory only when unset
    pub data_file: Option<PathBuf>,
    pub static_dir: PathBuf,
    /// Sessions idle longer than this are swept. `None` disables sweeping.
    pub session_idle: Option<Duration>,
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.parse().unwrap_or_else(|_| ([0, 0, 0, 0], 7678).into()),
            data_file: None,
            static_dir: PathBuf::from("static"),
            session_idle: Some(Duration::from_secs(DEFAULT_IDLE_SECS)),
            history_limit: HISTORY_LIMIT,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for anything missing or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind = match std::env::var("POINTPOKER_BIND") {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                tracing::warn!("Invalid POINTPOKER_BIND '{}': {}, using {}", v, e, defaults.bind);
                defaults.bind
            }),
            Err(_) => defaults.bind,
        };

        let data_file = std::env::var("POINTPOKER_DATA_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let static_dir = std::env::var("POINTPOKER_STATIC_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let session_idle = match std::env::var("POINTPOKER_SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.session_idle,
        };

        let history_limit = std::env::var("POINTPOKER_HISTORY_LIMIT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.history_limit)
            .clamp(1, HISTORY_LIMIT);

        Self {
            bind,
            data_file,
            static_dir,
            session_idle,
            history_limit,
        }
    }
}
