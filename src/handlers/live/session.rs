//! Session lifecycle coordinator.
//!
//! Owns one backend session per client connection:
//!
//! 1. `Connecting` - open the backend session with a fixed run configuration
//! 2. `Active` - run the inbound and outbound pumps concurrently
//! 3. `Draining` - first pump to exit wins; cancel the other, close the
//!    backend input queue exactly once, give the loser a bounded grace period
//! 4. `Closed` - send the close frame if the transport is still writable
//!
//! Teardown never waits on the losing pump for longer than the drain timeout.

use std::fmt::{self, Display};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, close_code};
use futures::{Sink, SinkExt, Stream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::inbound::run_inbound;
use super::messages::{ServerMessage, encode_server_message};
use super::outbound::run_outbound;
use super::pump::{PumpError, PumpOutcome};
use crate::core::live::{
    DEFAULT_EVENT_BUFFER, LiveError, LiveRequestQueue, RunConfig, SessionRequest,
    SharedLiveBackend,
};
use crate::core::telemetry::{LiveEventMonitor, Telemetry};

/// Default bound on a single client write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default grace period for the losing pump.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Settings & Phases
// =============================================================================

/// Per-connection tuning shared by all sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Capacity of the backend event channel
    pub event_buffer: usize,
    /// Bound on a single client write
    pub write_timeout: Duration,
    /// Grace period for the losing pump during teardown
    pub drain_timeout: Duration,
    /// Send `{"error":{...}}` before closing on failures
    pub error_frames: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            error_frames: false,
        }
    }
}

/// Lifecycle phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Connecting,
    Active,
    Draining,
    Closed,
}

impl SessionPhase {
    /// Move to `next` if it lies ahead of the current phase.
    pub fn advance(&mut self, next: SessionPhase) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            warn!(current = %self, requested = %next, "Ignoring backward session phase transition");
            false
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Connecting => write!(f, "connecting"),
            SessionPhase::Active => write!(f, "active"),
            SessionPhase::Draining => write!(f, "draining"),
            SessionPhase::Closed => write!(f, "closed"),
        }
    }
}

/// Which pump finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpSide {
    Inbound,
    Outbound,
}

impl fmt::Display for PumpSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpSide::Inbound => write!(f, "inbound"),
            PumpSide::Outbound => write!(f, "outbound"),
        }
    }
}

/// Summary of one finished session.
#[derive(Debug)]
pub struct SessionReport {
    /// Backend session id, `None` if opening failed
    pub session_id: Option<String>,
    /// Final phase (always `Closed` once `run` returns)
    pub phase: SessionPhase,
    /// Backend open failure
    pub open_error: Option<LiveError>,
    /// Pump that exited first
    pub first_exit: Option<PumpSide>,
    /// `None` if the pump was aborted or panicked
    pub inbound: Option<PumpOutcome>,
    pub outbound: Option<PumpOutcome>,
    /// Close code sent to the client, if the close frame could be sent
    pub close_code: Option<u16>,
}

impl SessionReport {
    fn new() -> Self {
        Self {
            session_id: None,
            phase: SessionPhase::Connecting,
            open_error: None,
            first_exit: None,
            inbound: None,
            outbound: None,
            close_code: None,
        }
    }

    /// Frames forwarded client to backend.
    pub fn frames_in(&self) -> u64 {
        self.inbound.as_ref().map_or(0, |o| o.forwarded)
    }

    /// Messages forwarded backend to client.
    pub fn frames_out(&self) -> u64 {
        self.outbound.as_ref().map_or(0, |o| o.forwarded)
    }

    /// The error that decided how the connection closed, if any.
    pub fn terminal_error(&self) -> Option<&PumpError> {
        let first = match self.first_exit? {
            PumpSide::Inbound => self.inbound.as_ref(),
            PumpSide::Outbound => self.outbound.as_ref(),
        };
        first.and_then(|o| o.result.as_ref().err())
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Runs client connections against a live backend.
#[derive(Clone)]
pub struct SessionCoordinator {
    backend: SharedLiveBackend,
    telemetry: Telemetry,
    settings: SessionSettings,
}

impl SessionCoordinator {
    pub fn new(backend: SharedLiveBackend, telemetry: Telemetry, settings: SessionSettings) -> Self {
        Self {
            backend,
            telemetry,
            settings,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Drive one connection from open to close.
    pub async fn run<W, S>(
        &self,
        mut sink: W,
        source: S,
        user_id: String,
        run_config: RunConfig,
    ) -> SessionReport
    where
        W: Sink<Message> + Unpin + Send + 'static,
        W::Error: Display + Send,
        S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
    {
        let mut report = SessionReport::new();

        // Connecting
        let mut request = SessionRequest::new(user_id.clone(), run_config);
        request.event_buffer = self.settings.event_buffer;

        let session = match self.backend.open(request).await {
            Ok(session) => session,
            Err(e) => {
                warn!(user_id = %user_id, backend = self.backend.name(), "Failed to open backend session: {}", e);
                let close = self
                    .close_transport(
                        &mut sink,
                        close_code::ERROR,
                        Some(("backend_unavailable", e.to_string())),
                    )
                    .await;
                report.close_code = close;
                report.open_error = Some(e);
                report.phase.advance(SessionPhase::Closed);
                return report;
            }
        };

        let (session_id, events, queue) = session.into_parts();
        report.session_id = Some(session_id.clone());
        info!(
            user_id = %user_id,
            session_id = %session_id,
            backend = self.backend.name(),
            "Live session started"
        );

        // Active
        report.phase.advance(SessionPhase::Active);
        let cancel = CancellationToken::new();
        let monitor =
            LiveEventMonitor::new(self.telemetry.clone(), session_id.clone(), self.backend.name());

        let mut inbound: JoinHandle<PumpOutcome> = tokio::spawn(run_inbound(
            source,
            queue.clone(),
            cancel.clone(),
            session_id.clone(),
        ));
        let mut outbound: JoinHandle<(PumpOutcome, W)> = tokio::spawn(run_outbound(
            sink,
            events,
            monitor,
            cancel.clone(),
            self.settings.write_timeout,
            session_id.clone(),
        ));

        let first = tokio::select! {
            result = &mut inbound => First::Inbound(result),
            result = &mut outbound => First::Outbound(result),
        };

        // Draining
        report.phase.advance(SessionPhase::Draining);
        cancel.cancel();
        Self::close_queue(&queue, &session_id);

        let mut sink = None;
        match first {
            First::Inbound(result) => {
                report.first_exit = Some(PumpSide::Inbound);
                report.inbound = Self::joined(result, PumpSide::Inbound, &session_id);
                if let Some((outcome, returned)) =
                    self.drain(outbound, PumpSide::Outbound, &session_id).await
                {
                    report.outbound = Some(outcome);
                    sink = Some(returned);
                }
            }
            First::Outbound(result) => {
                report.first_exit = Some(PumpSide::Outbound);
                if let Some((outcome, returned)) =
                    Self::joined(result, PumpSide::Outbound, &session_id)
                {
                    report.outbound = Some(outcome);
                    sink = Some(returned);
                }
                report.inbound = self.drain(inbound, PumpSide::Inbound, &session_id).await;
            }
        }

        // Closed
        if let Some(mut sink) = sink {
            let (code, error) = match report.terminal_error() {
                Some(e) => (e.close_code(), Some((e.code(), e.to_string()))),
                None => (close_code::NORMAL, None),
            };
            let close = self.close_transport(&mut sink, code, error).await;
            report.close_code = close;
        }
        report.phase.advance(SessionPhase::Closed);

        info!(
            user_id = %user_id,
            session_id = %session_id,
            first_exit = ?report.first_exit,
            frames_in = report.frames_in(),
            frames_out = report.frames_out(),
            close_code = ?report.close_code,
            "Live session closed"
        );
        report
    }

    /// Close the backend input exactly once.
    fn close_queue(queue: &LiveRequestQueue, session_id: &str) {
        if queue.close() {
            debug!(session_id = %session_id, "Backend session input closed");
        }
    }

    fn joined<T>(
        result: Result<T, tokio::task::JoinError>,
        side: PumpSide,
        session_id: &str,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!(session_id = %session_id, pump = %side, "Pump task failed: {}", e);
                None
            }
        }
    }

    /// Wait for the losing pump at most `drain_timeout`, then abort it.
    async fn drain<T>(
        &self,
        mut handle: JoinHandle<T>,
        side: PumpSide,
        session_id: &str,
    ) -> Option<T> {
        match tokio::time::timeout(self.settings.drain_timeout, &mut handle).await {
            Ok(result) => Self::joined(result, side, session_id),
            Err(_) => {
                warn!(session_id = %session_id, pump = %side, "Pump did not stop in time, aborting");
                handle.abort();
                None
            }
        }
    }

    /// Send the optional error frame and the close frame. Failures mean the
    /// client is already gone and are ignored.
    async fn close_transport<W>(
        &self,
        sink: &mut W,
        code: u16,
        error: Option<(&'static str, String)>,
    ) -> Option<u16>
    where
        W: Sink<Message> + Unpin,
        W::Error: Display,
    {
        let write_timeout = self.settings.write_timeout;

        if let Some((error_code, message)) = error.as_ref().filter(|_| self.settings.error_frames) {
            match encode_server_message(&ServerMessage::error(*error_code, message.as_str())) {
                Ok(json) => {
                    let _ = tokio::time::timeout(write_timeout, sink.send(Message::Text(json.into())))
                        .await;
                }
                Err(e) => error!("Failed to encode error frame: {}", e),
            }
        }

        let reason = error.map(|(error_code, _)| error_code).unwrap_or_default();
        let frame = Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        }));
        match tokio::time::timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => Some(code),
            Ok(Err(e)) => {
                debug!("Close frame not sent: {}", e);
                None
            }
            Err(_) => {
                debug!("Close frame timed out");
                None
            }
        }
    }
}

enum First<W> {
    Inbound(Result<PumpOutcome, tokio::task::JoinError>),
    Outbound(Result<(PumpOutcome, W), tokio::task::JoinError>),
}
