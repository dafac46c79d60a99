// Public API for integration tests and the server binary

pub mod api;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod estimate;
pub mod protocol;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use state::AppState;

/// Build the router: WebSocket, HTTP API, and the static client as fallback
pub fn app(state: Arc<AppState>, static_dir: impl AsRef<Path>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::health))
        .route("/sessions/{code}", get(api::get_session))
        .route("/sessions/{code}/history", get(api::get_history))
        .route("/state/export", get(api::export_state))
        .route("/state/import", post(api::import_state));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
