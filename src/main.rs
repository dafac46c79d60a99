use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pointpoker::{
    broadcast,
    config::ServerConfig,
    state::AppState,
    store::{FileStore, MemoryStore, Store},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointpoker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Point Poker...");

    let config = ServerConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    let store: Arc<dyn Store> = match &config.data_file {
        Some(path) => {
            tracing::info!("Persisting sessions to {}", path.display());
            Arc::new(FileStore::open(path).await?)
        }
        None => {
            tracing::info!("No data file configured, sessions live in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::with_store(store, config.history_limit));
    let restored = state.restore_from_store().await?;
    if restored > 0 {
        tracing::info!("Restored {} session(s)", restored);
    }

    // Spawn background task for dropping abandoned sessions
    match config.session_idle {
        Some(ttl) => broadcast::spawn_session_sweeper(state.clone(), ttl),
        None => tracing::info!("Session sweeper disabled"),
    }

    let app = pointpoker::app(state, &config.static_dir);

    tracing::info!("Listening on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
