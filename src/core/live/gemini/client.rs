//! Gemini Live backend implementation.
//!
//! Each [`LiveBackend::open`] call establishes one WebSocket connection to
//! the BidiGenerateContent endpoint, performs the `setup` handshake and then
//! hands the connection to a background task that:
//!
//! - forwards queued [`LiveRequest`]s as `clientContent` / `realtimeInput`
//! - translates server frames into [`LiveEvent`]s on a bounded channel
//!
//! The event channel ends when the server closes the connection, when the
//! session queue is closed, or with a [`LiveError::WebSocketError`] item on
//! transport failure. There is no reconnection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{debug, error, info, warn};

use super::config::{GeminiLiveConfig, is_prebuilt_voice};
use super::messages::{ClientMessage, ServerMessage, Setup};
use super::translator::EventTranslator;
use crate::core::live::base::{
    LiveBackend, LiveError, LiveEventSender, LiveRequest, LiveRequestQueue, LiveResult,
    LiveSession, SessionRequest, event_channel,
};

/// Live backend backed by the Gemini Live API.
#[derive(Debug, Clone)]
pub struct GeminiLiveBackend {
    config: GeminiLiveConfig,
}

impl GeminiLiveBackend {
    pub fn new(config: GeminiLiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeminiLiveConfig {
        &self.config
    }

    fn encode(message: &ClientMessage) -> LiveResult<Message> {
        let json = serde_json::to_string(message)
            .map_err(|e| LiveError::SerializationError(e.to_string()))?;
        Ok(Message::Text(json.into()))
    }
}

/// Read frames until `setupComplete` arrives.
async fn await_setup_complete<S>(stream: &mut S) -> LiveResult<()>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|e| LiveError::WebSocketError(e.to_string()))?;
        let payload = match frame {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.to_vec(),
            Message::Close(frame) => {
                let reason = frame
                    .map(|f| f.reason.as_str().to_string())
                    .unwrap_or_else(|| "no reason given".to_string());
                return Err(LiveError::ConnectionFailed(format!(
                    "Gemini Live closed during setup: {reason}"
                )));
            }
            _ => continue,
        };
        match ServerMessage::parse(&payload) {
            Ok(message) if message.setup_complete.is_some() => return Ok(()),
            Ok(_) => debug!("Ignoring Gemini frame received before setupComplete"),
            Err(e) => warn!("Failed to parse Gemini setup response: {}", e),
        }
    }
    Err(LiveError::ConnectionFailed(
        "Gemini Live closed before setupComplete".to_string(),
    ))
}

#[async_trait]
impl LiveBackend for GeminiLiveBackend {
    async fn open(&self, request: SessionRequest) -> LiveResult<LiveSession> {
        let url = self.config.ws_url()?;
        let client_request = url
            .as_str()
            .into_client_request()
            .map_err(|e| LiveError::InvalidConfiguration(e.to_string()))?;

        if !is_prebuilt_voice(&request.run_config.speech.voice_name) {
            warn!(
                voice = %request.run_config.speech.voice_name,
                "Voice is not a documented Gemini prebuilt voice"
            );
        }

        let setup = ClientMessage::Setup(Setup::from_run_config(
            self.config.model_resource(),
            &request.run_config,
        ));
        let setup_frame = Self::encode(&setup)?;

        let handshake = async {
            let (ws_stream, _) = tokio_tungstenite::connect_async(client_request)
                .await
                .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;
            let (mut sink, mut stream) = ws_stream.split();
            sink.send(setup_frame)
                .await
                .map_err(|e| LiveError::WebSocketError(e.to_string()))?;
            await_setup_complete(&mut stream).await?;
            Ok::<_, LiveError>((sink, stream))
        };

        let (sink, stream) = tokio::time::timeout(self.config.connect_timeout, handshake)
            .await
            .map_err(|_| {
                LiveError::Timeout(format!(
                    "Gemini Live setup did not complete within {:?}",
                    self.config.connect_timeout
                ))
            })??;

        let session_id = uuid::Uuid::new_v4().to_string();
        info!(
            user_id = %request.user_id,
            session_id = %session_id,
            model = %self.config.model,
            modalities = ?request.run_config.response_modalities,
            "Gemini Live session established"
        );

        let (events_tx, events_rx) = event_channel(request.event_buffer);
        let (queue, requests_rx) = LiveRequestQueue::new();

        tokio::spawn(run_connection(
            sink,
            stream,
            requests_rx,
            events_tx,
            self.config.close_timeout,
            session_id.clone(),
        ));

        Ok(LiveSession::new(session_id, events_rx, queue))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Send a close frame upstream, giving up after `close_timeout`.
///
/// Returns whether the frame was written.
async fn close_upstream<W>(sink: &mut W, close_timeout: Duration, session_id: &str) -> bool
where
    W: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    match tokio::time::timeout(close_timeout, sink.send(Message::Close(None))).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(session_id = %session_id, "Gemini Live close frame not sent: {}", e);
            false
        }
        Err(_) => {
            warn!(
                session_id = %session_id,
                timeout = ?close_timeout,
                "Gemini Live close frame timed out, dropping connection"
            );
            false
        }
    }
}

/// Drive one established connection until either side ends it.
async fn run_connection<W, S>(
    mut sink: W,
    mut stream: S,
    mut requests: mpsc::UnboundedReceiver<LiveRequest>,
    events: LiveEventSender,
    close_timeout: Duration,
    session_id: String,
) where
    W: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let mut translator = EventTranslator::new();
    let mut batch = Vec::new();

    loop {
        tokio::select! {
            request = requests.recv() => {
                let message = match request {
                    Some(LiveRequest::Content(content)) => ClientMessage::content(&content),
                    Some(LiveRequest::Realtime(blob)) => ClientMessage::audio(&blob),
                    Some(LiveRequest::Close) | None => {
                        debug!(session_id = %session_id, "Closing Gemini Live connection");
                        close_upstream(&mut sink, close_timeout, &session_id).await;
                        break;
                    }
                };

                let frame = match GeminiLiveBackend::encode(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!(session_id = %session_id, "Failed to serialize request: {}", e);
                        continue;
                    }
                };

                if let Err(e) = sink.send(frame).await {
                    error!(session_id = %session_id, "Failed to send to Gemini Live: {}", e);
                    let _ = events.send(Err(LiveError::WebSocketError(e.to_string()))).await;
                    break;
                }
            }

            frame = stream.next() => {
                let payload = match frame {
                    Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                    Some(Ok(Message::Binary(data))) => data.to_vec(),
                    Some(Ok(Message::Close(frame))) => {
                        info!(session_id = %session_id, close = ?frame, "Gemini Live closed the session");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!(session_id = %session_id, "Gemini Live WebSocket error: {}", e);
                        let _ = events.send(Err(LiveError::WebSocketError(e.to_string()))).await;
                        break;
                    }
                    None => {
                        debug!(session_id = %session_id, "Gemini Live stream ended");
                        break;
                    }
                };

                let message = match ServerMessage::parse(&payload) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(session_id = %session_id, "Skipping Gemini frame: {}", e);
                        continue;
                    }
                };

                translator.translate(message, &mut batch);
                let mut receiver_gone = false;
                for event in batch.drain(..) {
                    if events.send(Ok(event)).await.is_err() {
                        receiver_gone = true;
                        break;
                    }
                }
                if receiver_gone {
                    debug!(session_id = %session_id, "Event receiver dropped");
                    close_upstream(&mut sink, close_timeout, &session_id).await;
                    break;
                }
            }
        }
    }

    debug!(session_id = %session_id, "Gemini Live connection task ended");
}
