//! Live WebSocket handler
//!
//! `GET /ws/{user_id}?is_audio=<true|false>` upgrades to a WebSocket bound to
//! exactly one backend session for its whole lifetime.

use axum::{
    Extension,
    extract::{
        Path, Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::live::{Modality, RunConfig};
use crate::middleware::ConnectionSlot;
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
pub const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
pub const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Query parameters of the live endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LiveQuery {
    /// `"true"` selects spoken responses, anything else text
    #[serde(default)]
    pub is_audio: Option<String>,
}

impl LiveQuery {
    pub fn modality(&self) -> Modality {
        Modality::from_audio_flag(self.is_audio.as_deref() == Some("true"))
    }
}

/// Live WebSocket handler
///
/// The run configuration is fixed here, before the upgrade, from the server
/// defaults and the `is_audio` flag. The connection slot reserved by the
/// middleware stays alive until the socket task ends.
pub async fn live_ws_handler(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    Query(query): Query<LiveQuery>,
    State(state): State<Arc<AppState>>,
    slot: Option<Extension<Arc<ConnectionSlot>>>,
) -> Response {
    let modality = query.modality();
    info!(
        user_id = %user_id,
        modality = %modality,
        "Live WebSocket connection upgrade requested"
    );

    let run_config = state.config.session.run_config(modality);
    let slot = slot.map(|Extension(slot)| slot);

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_live_socket(socket, state, user_id, run_config, slot))
}

async fn handle_live_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    user_id: String,
    run_config: RunConfig,
    _slot: Option<Arc<ConnectionSlot>>,
) {
    info!(user_id = %user_id, "Live WebSocket connection established");
    let _active = state.session_started();

    let (sender, receiver) = socket.split();
    let report = state
        .coordinator()
        .run(sender, receiver, user_id.clone(), run_config)
        .await;

    debug!(
        user_id = %user_id,
        session_id = ?report.session_id,
        phase = %report.phase,
        "Live WebSocket connection terminated"
    );
}
