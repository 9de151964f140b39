//! Connection limit middleware for WebSocket connections
//!
//! This module provides middleware to enforce connection limits:
//! - Global maximum WebSocket connections
//! - Per-IP connection limits
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use live_voice_gateway::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/ws/{user_id}", get(live_ws_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::{AppState, ConnectionLimitError};

/// A reserved WebSocket connection slot, returned to [`AppState`] on drop.
///
/// The middleware stores it in the request extensions as an `Arc`. Every
/// clone must be dropped before the slot is released: the request's own copy
/// goes when the request is done, and the live handler keeps one for the
/// lifetime of the upgraded socket. A request rejected by an extractor
/// therefore frees its slot as soon as the response is produced.
pub struct ConnectionSlot {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl ConnectionSlot {
    /// Reserve a slot for `ip`.
    pub fn acquire(state: Arc<AppState>, ip: IpAddr) -> Result<Self, ConnectionLimitError> {
        state.try_acquire_connection(ip)?;
        Ok(Self { state, ip })
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
        tracing::debug!(
            ip = %self.ip,
            active = self.state.ws_connection_count(),
            "WebSocket connection slot released"
        );
    }
}

fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

impl IntoResponse for ConnectionLimitError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ConnectionLimitError::GlobalLimitReached => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            ),
            ConnectionLimitError::PerIpLimitReached => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            ),
        };
        (status, message).into_response()
    }
}

/// Middleware that enforces connection limits for WebSocket upgrades.
///
/// Over the global limit the request gets 503, over the per-IP limit 429.
/// Accepted upgrades carry an `Arc<ConnectionSlot>` extension. Requests
/// without an `Upgrade: websocket` header pass through untouched.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(&request) {
        return next.run(request).await;
    }

    let client_ip = addr.ip();
    match ConnectionSlot::acquire(state.clone(), client_ip) {
        Ok(slot) => {
            tracing::debug!(
                ip = %client_ip,
                active = state.ws_connection_count(),
                "WebSocket connection slot acquired"
            );
            request.extensions_mut().insert(Arc::new(slot));
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(ip = %client_ip, "Rejecting connection: {}", e);
            e.into_response()
        }
    }
}
