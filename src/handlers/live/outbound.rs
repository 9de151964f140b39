//! Outbound pump: backend session to client transport.
//!
//! Each backend event yields zero or one wire message, written in backend
//! emission order. Classification:
//!
//! 1. partial caller transcription: caption tagged `is_user_input`
//! 2. turn signal: control message
//! 3. partial agent transcription: text message
//! 4. otherwise the first content part: PCM audio, or partial text
//!
//! Everything else (final transcriptions, usage, empty text, non-PCM data)
//! produces nothing on the wire.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::messages::{ServerMessage, encode_server_message};
use super::pump::{PumpError, PumpExit, PumpOutcome};
use crate::core::live::{LiveEvent, LiveEventReceiver, Part};
use crate::core::telemetry::LiveEventMonitor;

/// Map one backend event to its wire message, if any.
pub fn classify_event(event: &LiveEvent) -> Option<ServerMessage> {
    match event {
        LiveEvent::InputTranscription(t) if t.partial => {
            (!t.text.is_empty()).then(|| ServerMessage::user_caption(t.text.as_str()))
        }
        LiveEvent::Turn(signal) => Some(ServerMessage::control(*signal)),
        LiveEvent::OutputTranscription(t) if t.partial => {
            (!t.text.is_empty()).then(|| ServerMessage::text(t.text.as_str()))
        }
        LiveEvent::Content { content, partial } => match content.first_part()? {
            Part::InlineData(blob) if blob.is_pcm_audio() && !blob.data.is_empty() => {
                Some(ServerMessage::audio(&blob.data))
            }
            Part::Text(text) if *partial && !text.is_empty() => {
                Some(ServerMessage::text(text.as_str()))
            }
            _ => None,
        },
        LiveEvent::InputTranscription(_)
        | LiveEvent::OutputTranscription(_)
        | LiveEvent::Usage(_) => None,
    }
}

/// Run the outbound pump until the event sequence ends, the transport fails,
/// the backend faults or `cancel` fires.
///
/// The sink is handed back so the caller can still send a close frame.
pub async fn run_outbound<W>(
    mut sink: W,
    mut events: LiveEventReceiver,
    monitor: LiveEventMonitor,
    cancel: CancellationToken,
    write_timeout: Duration,
    session_id: String,
) -> (PumpOutcome, W)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    let mut forwarded = 0u64;

    let result = loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(PumpExit::Cancelled),
            event = events.recv() => event,
        };

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!(session_id = %session_id, "Backend session fault: {}", e);
                break Err(PumpError::Backend(e));
            }
            None => {
                debug!(session_id = %session_id, "Backend event sequence ended");
                break Ok(PumpExit::SourceEnded);
            }
        };

        monitor.observe(&event);

        let Some(message) = classify_event(&event) else {
            continue;
        };

        let json = match encode_server_message(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(
                    session_id = %session_id,
                    event = event.kind(),
                    "Dropping event that failed to encode: {}", e
                );
                continue;
            }
        };

        let write = tokio::time::timeout(write_timeout, sink.send(Message::Text(json.into())));
        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(PumpExit::Cancelled),
            written = write => written,
        };

        match written {
            Ok(Ok(())) => forwarded += 1,
            Ok(Err(e)) => {
                debug!(session_id = %session_id, "Client write failed: {}", e);
                break Ok(PumpExit::TransportClosed);
            }
            Err(_) => {
                warn!(
                    session_id = %session_id,
                    timeout_ms = write_timeout.as_millis() as u64,
                    "Client write timed out"
                );
                break Err(PumpError::WriteTimeout(write_timeout));
            }
        }
    };

    (PumpOutcome::new(result, forwarded), sink)
}
