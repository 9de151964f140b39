//! HTTP and WebSocket request handlers
//!
//! - `api` - health check and frontend redirect
//! - `live` - live duplex voice session WebSocket

pub mod api;
pub mod live;

// Re-export commonly used handlers for convenient access
pub use live::live_ws_handler;
