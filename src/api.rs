//! HTTP API endpoints.
//!
//! Read-only session lookups for bookmarked links and the export/import pair
//! used to back up or move a running server.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::protocol::SessionView;
use crate::state::export::StateExport;
use crate::state::{normalize_code, AppState};
use crate::types::HistoryItem;

/// Errors returned by the HTTP API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("import failed: {0}")]
    InvalidImport(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
            ApiError::InvalidImport(_) => (StatusCode::BAD_REQUEST, "INVALID_IMPORT"),
        };
        let body = ErrorBody {
            code,
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
    pub store: String,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.sessions.read().await.len(),
        store: state.store.name().to_string(),
    })
}

/// GET /api/sessions/{code}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let code = normalize_code(&code);
    match state.session_view(&code).await {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError::SessionNotFound(code)),
    }
}

/// GET /api/sessions/{code}/history
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let code = normalize_code(&code);
    if state.get_session(&code).await.is_none() {
        return Err(ApiError::SessionNotFound(code));
    }
    Ok(Json(state.get_history(&code).await))
}

/// Export every session and its history as JSON.
///
/// GET /api/state/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<StateExport> {
    Json(state.export_state().await)
}

/// Import a state snapshot.
///
/// POST /api/state/import
///
/// Replaces all current sessions and history with the imported data.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(export): Json<StateExport>,
) -> Result<StatusCode, ApiError> {
    state.import_state(export).await.map_err(|e| {
        tracing::error!("State import failed: {}", e);
        ApiError::InvalidImport(e)
    })?;
    Ok(StatusCode::NO_CONTENT)
}
