pub mod api;
pub mod live;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Assemble the application routes with their state.
///
/// The live routes sit behind `connection_limit_middleware`, so the server
/// must be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_app(state: Arc<AppState>) -> Router {
    let live_routes = live::create_live_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    api::create_api_router()
        .merge(live_routes)
        .with_state(state)
}
