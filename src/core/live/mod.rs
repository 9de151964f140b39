//! Live conversational backend module.
//!
//! A live backend owns a streaming conversation: it consumes committed text
//! turns and raw audio frames, and produces transcriptions, model content and
//! turn signals.
//!
//! # Supported Backends
//!
//! - **Gemini Live** - native-audio Gemini model over the BidiGenerateContent WebSocket
//! - **Loopback** - local echo backend for development and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use live_voice_gateway::core::live::{
//!     LiveBackendKind, Modality, RunConfig, SessionRequest, SpeechConfig, create_live_backend,
//! };
//!
//! let backend = create_live_backend(LiveBackendKind::Loopback, None)?;
//! let run_config = RunConfig::new(Modality::Audio, SpeechConfig::default());
//! let session = backend.open(SessionRequest::new("user-1", run_config)).await?;
//! ```

mod base;
pub mod gemini;
pub mod loopback;

use std::sync::Arc;

pub use base::{
    Blob, Content, DEFAULT_EVENT_BUFFER, DEFAULT_LANGUAGE_CODE, DEFAULT_VOICE_NAME, LiveBackend,
    LiveError, LiveEvent, LiveEventReceiver, LiveEventSender, LiveRequest, LiveRequestQueue,
    LiveResult, LiveSession, Modality, PCM_MIME_TYPE, Part, RunConfig, SessionRequest,
    SharedLiveBackend, SpeechConfig, Transcription, TurnSignal, UsageMetadata, event_channel,
};
pub use gemini::{GeminiLiveBackend, GeminiLiveConfig};
pub use loopback::LoopbackBackend;

/// Supported live backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveBackendKind {
    /// Gemini Live API
    #[default]
    Gemini,
    /// Local echo backend
    Loopback,
}

impl LiveBackendKind {
    /// Parse backend from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "gemini-live" | "google" => Some(LiveBackendKind::Gemini),
            "loopback" | "echo" => Some(LiveBackendKind::Loopback),
            _ => None,
        }
    }
}

impl std::fmt::Display for LiveBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveBackendKind::Gemini => write!(f, "gemini"),
            LiveBackendKind::Loopback => write!(f, "loopback"),
        }
    }
}

/// Create a shared live backend.
///
/// The Gemini backend requires a configuration carrying an API key.
pub fn create_live_backend(
    kind: LiveBackendKind,
    gemini: Option<GeminiLiveConfig>,
) -> LiveResult<SharedLiveBackend> {
    match kind {
        LiveBackendKind::Gemini => {
            let config = gemini.ok_or_else(|| {
                LiveError::InvalidConfiguration(
                    "Gemini backend selected but no Gemini configuration was provided".to_string(),
                )
            })?;
            if config.api_key.is_empty() {
                return Err(LiveError::AuthenticationFailed(
                    "GEMINI_API_KEY (or GOOGLE_API_KEY) must be set for the gemini backend"
                        .to_string(),
                ));
            }
            Ok(Arc::new(GeminiLiveBackend::new(config)))
        }
        LiveBackendKind::Loopback => Ok(Arc::new(LoopbackBackend::new())),
    }
}

/// Get list of supported live backends.
pub fn get_supported_live_backends() -> Vec<&'static str> {
    vec!["gemini", "loopback"]
}
