//! Shared pump result types.

use std::fmt;
use std::time::Duration;

use axum::extract::ws::close_code;
use thiserror::Error;

use super::messages::CodecError;
use crate::core::live::LiveError;

/// Expected, error-free pump termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// The client transport closed or failed
    TransportClosed,
    /// The backend event sequence ended
    SourceEnded,
    /// The backend stopped accepting input
    SessionClosed,
    /// Cancelled by the coordinator after the other pump exited
    Cancelled,
}

impl fmt::Display for PumpExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpExit::TransportClosed => write!(f, "transport closed"),
            PumpExit::SourceEnded => write!(f, "event sequence ended"),
            PumpExit::SessionClosed => write!(f, "session closed"),
            PumpExit::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Pump failure.
#[derive(Debug, Error)]
pub enum PumpError {
    /// The client sent something outside the wire protocol
    #[error("Protocol violation: {0}")]
    Protocol(#[from] CodecError),

    /// The backend session failed
    #[error("Backend session fault: {0}")]
    Backend(#[from] LiveError),

    /// A write to the client did not complete in time
    #[error("Write to client timed out after {0:?}")]
    WriteTimeout(Duration),
}

impl PumpError {
    /// Machine-readable code used in error frames.
    pub fn code(&self) -> &'static str {
        match self {
            PumpError::Protocol(e) => e.code(),
            PumpError::Backend(_) => "backend_error",
            PumpError::WriteTimeout(_) => "write_timeout",
        }
    }

    /// WebSocket close code for a connection ended by this error.
    pub fn close_code(&self) -> u16 {
        match self {
            PumpError::Protocol(e) => e.close_code(),
            PumpError::Backend(_) | PumpError::WriteTimeout(_) => close_code::ERROR,
        }
    }
}

/// What a pump did before it stopped.
#[derive(Debug)]
pub struct PumpOutcome {
    pub result: Result<PumpExit, PumpError>,
    /// Messages forwarded in this pump's direction
    pub forwarded: u64,
}

impl PumpOutcome {
    pub fn new(result: Result<PumpExit, PumpError>, forwarded: u64) -> Self {
        Self { result, forwarded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_codes() {
        let protocol = PumpError::from(CodecError::UnsupportedMimeType("video/mp4".into()));
        assert_eq!(protocol.close_code(), 1003);
        assert_eq!(protocol.code(), "unsupported_mime_type");

        let backend = PumpError::from(LiveError::WebSocketError("reset".into()));
        assert_eq!(backend.close_code(), 1011);
        assert_eq!(backend.code(), "backend_error");

        let timeout = PumpError::WriteTimeout(Duration::from_millis(5));
        assert_eq!(timeout.close_code(), 1011);
    }

    #[test]
    fn test_exit_display() {
        assert_eq!(PumpExit::TransportClosed.to_string(), "transport closed");
        assert_eq!(PumpExit::Cancelled.to_string(), "cancelled");
    }
}
