use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Name of the configured live backend
    pub backend: &'static str,
    pub active_sessions: usize,
}

/// Health check endpoint
///
/// `GET /health` returns `{"status":"OK","backend":"<name>","active_sessions":<n>}`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        backend: state.backend.name(),
        active_sessions: state.active_sessions(),
    })
}

/// `GET /` answers with a temporary redirect to the configured frontend.
pub async fn frontend_redirect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Redirect::temporary(&state.config.frontend_url)
}
