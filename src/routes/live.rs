//! Live WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::live::live_ws_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the live WebSocket router
///
/// # Endpoint
///
/// `GET /ws/{user_id}?is_audio=<true|false>` - WebSocket upgrade bound to one
/// backend session
///
/// # Protocol
///
/// Both directions carry JSON text frames. The client sends
/// `{"mime_type":"text/plain","data":"..."}` for committed text and
/// `{"mime_type":"audio/pcm","data":"<base64>"}` for raw 16 kHz PCM audio.
/// The server answers with text, `is_user_input` captions, base64 audio and
/// `{"turn_complete":..,"interrupted":..}` control messages.
///
/// Connection limits are applied by `connection_limit_middleware` in
/// [`create_app`](super::create_app).
pub fn create_live_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/{user_id}", get(live_ws_handler))
        .layer(TraceLayer::new_for_http())
}
