//! Live duplex session handler
//!
//! Bridges one client WebSocket to one live backend session:
//!
//! - `messages` - client wire protocol codec
//! - `inbound` - client frames to the backend request queue
//! - `outbound` - backend events to client frames
//! - `session` - lifecycle coordination of both pumps
//! - `handler` - the `GET /ws/{user_id}` upgrade endpoint

pub mod handler;
pub mod inbound;
pub mod messages;
pub mod outbound;
pub mod pump;
pub mod session;

pub use handler::{LiveQuery, MAX_WS_FRAME_SIZE, MAX_WS_MESSAGE_SIZE, live_ws_handler};
pub use messages::{
    AUDIO_MIME_TYPE, ClientMessage, CodecError, InboundFrame, ServerMessage, TEXT_MIME_TYPE,
    decode_client_message, encode_server_message,
};
pub use outbound::classify_event;
pub use pump::{PumpError, PumpExit, PumpOutcome};
pub use session::{
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_WRITE_TIMEOUT, PumpSide, SessionCoordinator, SessionPhase,
    SessionReport, SessionSettings,
};
