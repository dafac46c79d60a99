//! Key-value persistence for session snapshots and ticket history.
//!
//! Keys and values are plain strings, values holding JSON. Callers own the
//! key layout (see [`session_key`] and [`history_key`]).

mod file;
mod memory;

use async_trait::async_trait;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed store contents: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Prefix for session snapshot keys
pub const SESSION_KEY_PREFIX: &str = "session:";
/// Prefix for ticket history keys
pub const HISTORY_KEY_PREFIX: &str = "history:";

pub fn session_key(code: &str) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, code)
}

pub fn history_key(code: &str) -> String {
    format!("{}{}", HISTORY_KEY_PREFIX, code)
}

/// Trait that all storage backends implement
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a value, `None` if the key is absent
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Delete a key. Removing an absent key is not an error
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// All keys starting with `prefix`, in ascending order
    async fn keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Name of this backend, for logging
    fn name(&self) -> &str;
}
