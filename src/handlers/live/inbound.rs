//! Inbound pump: client transport to backend session.
//!
//! Frames are decoded and forwarded in receipt order. A clean close (or a
//! read error, which is indistinguishable from one for a WebSocket) ends the
//! pump without error; anything outside the wire protocol fails it.

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::messages::{CodecError, InboundFrame, decode_client_message};
use super::pump::{PumpError, PumpExit, PumpOutcome};
use crate::core::live::{Blob, Content, LiveError, LiveRequestQueue};

/// Run the inbound pump until the transport closes, a protocol violation
/// occurs or `cancel` fires.
pub async fn run_inbound<S>(
    mut source: S,
    queue: LiveRequestQueue,
    cancel: CancellationToken,
    session_id: String,
) -> PumpOutcome
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let mut forwarded = 0u64;

    let result = loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Ok(PumpExit::Cancelled),
            frame = source.next() => frame,
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Binary(_))) => {
                error!(session_id = %session_id, "Binary frame received, closing connection");
                break Err(PumpError::Protocol(CodecError::BinaryFrame));
            }
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(frame))) => {
                debug!(session_id = %session_id, close = ?frame, "Client closed connection");
                break Ok(PumpExit::TransportClosed);
            }
            Some(Err(e)) => {
                debug!(session_id = %session_id, "Client read error: {}", e);
                break Ok(PumpExit::TransportClosed);
            }
            None => {
                debug!(session_id = %session_id, "Client stream ended");
                break Ok(PumpExit::TransportClosed);
            }
        };

        let sent = match decode_client_message(text.as_str()) {
            Ok(InboundFrame::Text(text)) => queue.send_content(Content::user_text(text)),
            Ok(InboundFrame::Audio(data)) => queue.send_realtime(Blob::pcm(data)),
            Err(e) => {
                error!(session_id = %session_id, "Protocol violation: {}", e);
                break Err(PumpError::Protocol(e));
            }
        };

        match sent {
            Ok(()) => forwarded += 1,
            Err(LiveError::SessionClosed) => {
                debug!(session_id = %session_id, "Backend stopped accepting input");
                break Ok(PumpExit::SessionClosed);
            }
            Err(e) => break Err(PumpError::Backend(e)),
        }
    };

    PumpOutcome::new(result, forwarded)
}
