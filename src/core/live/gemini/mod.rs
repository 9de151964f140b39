//! Gemini Live API backend.
//!
//! Streams audio and text to a Gemini native-audio model over the
//! BidiGenerateContent WebSocket and translates its output into
//! [`LiveEvent`](crate::core::live::LiveEvent)s.
//!
//! # Audio Format
//!
//! Input audio is PCM 16-bit little-endian at 16kHz, output audio is PCM
//! 16-bit at 24kHz (`audio/pcm;rate=24000`).

mod client;
mod config;
mod messages;
mod translator;

pub use client::GeminiLiveBackend;
pub use config::{
    DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_GEMINI_MODEL, GEMINI_INPUT_SAMPLE_RATE, GEMINI_LIVE_URL,
    GEMINI_OUTPUT_SAMPLE_RATE, GEMINI_PREBUILT_VOICES, GeminiLiveConfig, is_prebuilt_voice,
};
pub use messages::{ClientMessage, ServerContent, ServerMessage, Setup};
pub use translator::EventTranslator;
