//! Loopback backend for local development and tests.
//!
//! Requires no credentials. Text turns are answered by echoing the words back
//! as an incremental output transcription, audio frames are echoed as 24kHz
//! PCM content. The event sequence ends after the queue is closed.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::base::{
    Blob, Content, LiveBackend, LiveEvent, LiveEventSender, LiveRequest, LiveRequestQueue,
    LiveResult, LiveSession, PCM_MIME_TYPE, Part, SessionRequest, Transcription, TurnSignal,
    event_channel,
};

/// Sample rate tag attached to echoed audio.
const LOOPBACK_OUTPUT_RATE: u32 = 24000;

/// Backend that answers every request locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackBackend;

impl LoopbackBackend {
    pub fn new() -> Self {
        Self
    }

    /// Events produced for one committed text turn.
    pub fn reply_to_text(text: &str) -> Vec<LiveEvent> {
        let mut events: Vec<LiveEvent> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| {
                let chunk = if i == 0 {
                    word.to_string()
                } else {
                    format!(" {word}")
                };
                LiveEvent::OutputTranscription(Transcription::partial(chunk))
            })
            .collect();

        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !normalized.is_empty() {
            events.push(LiveEvent::Content {
                content: Content::model(Part::Text(normalized)),
                partial: false,
            });
        }

        events.push(LiveEvent::Turn(TurnSignal {
            turn_complete: true,
            interrupted: false,
        }));
        events
    }

    /// Event produced for one realtime audio frame.
    pub fn reply_to_audio(blob: Blob) -> LiveEvent {
        LiveEvent::Content {
            content: Content::model(Part::InlineData(Blob {
                mime_type: format!("{PCM_MIME_TYPE};rate={LOOPBACK_OUTPUT_RATE}"),
                data: blob.data,
            })),
            partial: true,
        }
    }
}

#[async_trait]
impl LiveBackend for LoopbackBackend {
    async fn open(&self, request: SessionRequest) -> LiveResult<LiveSession> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (events_tx, events_rx) = event_channel(request.event_buffer);
        let (queue, requests_rx) = LiveRequestQueue::new();

        debug!(
            user_id = %request.user_id,
            session_id = %session_id,
            "Loopback session opened"
        );

        tokio::spawn(run_loopback(requests_rx, events_tx, session_id.clone()));
        Ok(LiveSession::new(session_id, events_rx, queue))
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

async fn run_loopback(
    mut requests: mpsc::UnboundedReceiver<LiveRequest>,
    events: LiveEventSender,
    session_id: String,
) {
    while let Some(request) = requests.recv().await {
        let replies = match request {
            LiveRequest::Content(content) => {
                let text: String = content
                    .parts
                    .iter()
                    .filter_map(Part::text)
                    .collect::<Vec<_>>()
                    .join(" ");
                LoopbackBackend::reply_to_text(&text)
            }
            LiveRequest::Realtime(blob) => vec![LoopbackBackend::reply_to_audio(blob)],
            LiveRequest::Close => break,
        };

        for event in replies {
            if events.send(Ok(event)).await.is_err() {
                debug!(session_id = %session_id, "Loopback receiver dropped");
                return;
            }
        }
    }
    debug!(session_id = %session_id, "Loopback session ended");
}
