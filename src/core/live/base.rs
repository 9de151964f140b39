//! Base traits and types for live conversational backends.
//!
//! A live backend owns one streaming conversation per client connection. Opening
//! a session yields two halves:
//!
//! - an event sequence ([`LiveEventReceiver`]) produced by the backend, and
//! - an input sink ([`LiveRequestQueue`]) accepting committed text or raw audio.
//!
//! # Audio Format
//!
//! Input audio is PCM 16-bit signed little-endian at 16kHz. Output audio is
//! PCM 16-bit at 24kHz, tagged with an `audio/pcm` MIME type.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// MIME type prefix identifying raw PCM audio.
pub const PCM_MIME_TYPE: &str = "audio/pcm";

/// Default prebuilt voice for spoken responses.
pub const DEFAULT_VOICE_NAME: &str = "Charon";

/// Default language for speech recognition and synthesis.
pub const DEFAULT_LANGUAGE_CODE: &str = "de-DE";

/// Default capacity of the backend event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to a live backend.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Backend-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The session input queue has been closed
    #[error("Session closed")]
    SessionClosed,
}

/// Result type for live backend operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Run Configuration
// =============================================================================

/// Response modality requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Spoken responses (PCM audio plus transcription)
    Audio,
    /// Text-only responses
    Text,
}

impl Modality {
    /// Pick the modality from the client's `is_audio` flag.
    pub fn from_audio_flag(is_audio: bool) -> Self {
        if is_audio { Self::Audio } else { Self::Text }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
            Self::Text => "TEXT",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice and language parameters for speech output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Prebuilt voice name (e.g., "Charon", "Puck", "Kore")
    pub voice_name: String,
    /// BCP-47 language code (e.g., "de-DE")
    pub language_code: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice_name: DEFAULT_VOICE_NAME.to_string(),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }
}

/// Per-session run configuration.
///
/// Fixed when the session is opened and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Response modalities (one entry in practice)
    pub response_modalities: Vec<Modality>,
    /// Voice and language parameters
    pub speech: SpeechConfig,
    /// Transcribe the caller's speech
    pub input_audio_transcription: bool,
    /// Transcribe the agent's speech
    pub output_audio_transcription: bool,
    /// Ask the backend for session resumption handles
    pub session_resumption: bool,
    /// System instructions for the agent
    pub instructions: Option<String>,
}

impl RunConfig {
    /// Build a run configuration with transcription enabled in both directions.
    pub fn new(modality: Modality, speech: SpeechConfig) -> Self {
        Self {
            response_modalities: vec![modality],
            speech,
            input_audio_transcription: true,
            output_audio_transcription: true,
            session_resumption: false,
            instructions: None,
        }
    }

    pub fn is_audio(&self) -> bool {
        self.response_modalities.contains(&Modality::Audio)
    }
}

// =============================================================================
// Content Model
// =============================================================================

/// Inline binary payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub data: Bytes,
}

impl Blob {
    /// Raw PCM audio frame.
    pub fn pcm(data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: PCM_MIME_TYPE.to_string(),
            data: data.into(),
        }
    }

    /// True when the MIME type identifies raw PCM audio (any sample rate).
    pub fn is_pcm_audio(&self) -> bool {
        self.mime_type.starts_with(PCM_MIME_TYPE)
    }
}

/// One part of a structured content chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Literal text
    Text(String),
    /// Inline binary data (audio)
    InlineData(Blob),
}

impl Part {
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData(_) => None,
        }
    }

    pub fn inline_data(&self) -> Option<&Blob> {
        match self {
            Part::InlineData(blob) => Some(blob),
            Part::Text(_) => None,
        }
    }
}

/// Structured content exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// "user" or "model"
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// A committed user text turn.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Model output consisting of a single part.
    pub fn model(part: Part) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![part],
        }
    }

    /// Only the first part is significant to the gateway.
    pub fn first_part(&self) -> Option<&Part> {
        self.parts.first()
    }

    /// True when any part carries non-empty text.
    pub fn has_text(&self) -> bool {
        self.parts
            .iter()
            .any(|p| p.text().is_some_and(|t| !t.is_empty()))
    }
}

// =============================================================================
// Events
// =============================================================================

/// Incremental or final speech transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
    pub partial: bool,
}

impl Transcription {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            partial: true,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            partial: false,
        }
    }
}

/// End-of-turn or barge-in signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSignal {
    pub turn_complete: bool,
    pub interrupted: bool,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub response_token_count: u32,
    pub total_token_count: u32,
}

/// One event produced by a live backend session.
///
/// Each event carries exactly one of these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Caller's speech, recognized incrementally
    InputTranscription(Transcription),
    /// Agent's speech, recognized incrementally
    OutputTranscription(Transcription),
    /// Structured content (audio or text parts)
    Content { content: Content, partial: bool },
    /// Turn completion or interruption
    Turn(TurnSignal),
    /// Telemetry only, never written to the client
    Usage(UsageMetadata),
}

impl LiveEvent {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::InputTranscription(_) => "input_transcription",
            LiveEvent::OutputTranscription(_) => "output_transcription",
            LiveEvent::Content { .. } => "content",
            LiveEvent::Turn(_) => "turn",
            LiveEvent::Usage(_) => "usage",
        }
    }
}

// =============================================================================
// Input Queue
// =============================================================================

/// Request forwarded from the client into the backend session.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveRequest {
    /// Committed content (a user text turn)
    Content(Content),
    /// Realtime audio frame
    Realtime(Blob),
    /// Explicit end of the session
    Close,
}

/// Ordered input sink of a live session.
///
/// Sends never block. Clones share the same closed flag, so the backend
/// receives [`LiveRequest::Close`] exactly once regardless of how many
/// clones call [`close`](Self::close).
#[derive(Debug, Clone)]
pub struct LiveRequestQueue {
    tx: mpsc::UnboundedSender<LiveRequest>,
    closed: Arc<AtomicBool>,
}

impl LiveRequestQueue {
    /// Create a queue and the receiving end handed to the backend.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LiveRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Append a committed user content turn.
    pub fn send_content(&self, content: Content) -> LiveResult<()> {
        self.send(LiveRequest::Content(content))
    }

    /// Append a realtime audio frame.
    pub fn send_realtime(&self, blob: Blob) -> LiveResult<()> {
        self.send(LiveRequest::Realtime(blob))
    }

    /// Signal the end of the session.
    ///
    /// Returns `true` only for the call that actually closed the queue.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        // The backend may already be gone; the close still counts.
        let _ = self.tx.send(LiveRequest::Close);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn send(&self, request: LiveRequest) -> LiveResult<()> {
        if self.is_closed() {
            return Err(LiveError::SessionClosed);
        }
        self.tx.send(request).map_err(|_| LiveError::SessionClosed)
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Receiving end of a backend event sequence. `Err` items are backend faults.
pub type LiveEventReceiver = mpsc::Receiver<LiveResult<LiveEvent>>;

/// Sending end used by backend implementations.
pub type LiveEventSender = mpsc::Sender<LiveResult<LiveEvent>>;

/// Create a bounded event channel.
pub fn event_channel(capacity: usize) -> (LiveEventSender, LiveEventReceiver) {
    mpsc::channel(capacity.max(1))
}

/// One open backend session, bound to a single client connection.
#[derive(Debug)]
pub struct LiveSession {
    session_id: String,
    events: LiveEventReceiver,
    queue: LiveRequestQueue,
}

impl LiveSession {
    pub fn new(session_id: String, events: LiveEventReceiver, queue: LiveRequestQueue) -> Self {
        Self {
            session_id,
            events,
            queue,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn queue(&self) -> &LiveRequestQueue {
        &self.queue
    }

    /// Close the input side. Idempotent.
    pub fn close(&self) -> bool {
        self.queue.close()
    }

    /// Split into the event sequence and the input sink.
    pub fn into_parts(self) -> (String, LiveEventReceiver, LiveRequestQueue) {
        (self.session_id, self.events, self.queue)
    }
}

/// Parameters for opening a session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Opaque caller identifier
    pub user_id: String,
    /// Immutable run configuration
    pub run_config: RunConfig,
    /// Capacity of the event channel
    pub event_buffer: usize,
}

impl SessionRequest {
    pub fn new(user_id: impl Into<String>, run_config: RunConfig) -> Self {
        Self {
            user_id: user_id.into(),
            run_config,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// A conversational backend able to open live sessions.
#[async_trait]
pub trait LiveBackend: Send + Sync {
    /// Open a new session. The returned handle is owned by one connection.
    async fn open(&self, request: SessionRequest) -> LiveResult<LiveSession>;

    /// Backend name used in logs and health output.
    fn name(&self) -> &'static str;
}

/// Shared backend handle stored in application state.
pub type SharedLiveBackend = Arc<dyn LiveBackend>;
