//! Gemini Live API configuration types.

use std::time::Duration;

use zeroize::Zeroize;

use crate::core::live::base::{LiveError, LiveResult};

/// Gemini Live BidiGenerateContent WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Native-audio model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-native-audio-latest";

/// Sample rate the Live API expects for input audio.
pub const GEMINI_INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate of audio produced by the Live API.
pub const GEMINI_OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Time allowed for the WebSocket handshake plus `setupComplete`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on sending the close frame when a session ends.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Prebuilt voices offered by the Live API.
pub const GEMINI_PREBUILT_VOICES: &[&str] = &[
    "Puck", "Charon", "Kore", "Fenrir", "Aoede", "Leda", "Orus", "Zephyr",
];

/// Whether `name` is one of the documented prebuilt voices.
pub fn is_prebuilt_voice(name: &str) -> bool {
    GEMINI_PREBUILT_VOICES
        .iter()
        .any(|v| v.eq_ignore_ascii_case(name))
}

/// Connection settings for the Gemini Live backend.
#[derive(Clone)]
pub struct GeminiLiveConfig {
    /// API key, sent as the `key` query parameter
    pub api_key: String,
    /// Model name without the `models/` prefix
    pub model: String,
    /// WebSocket endpoint (overridable for tests)
    pub url: String,
    /// Handshake timeout
    pub connect_timeout: Duration,
    /// Close frame send timeout
    pub close_timeout: Duration,
}

impl std::fmt::Debug for GeminiLiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("url", &self.url)
            .field("connect_timeout", &self.connect_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

impl Drop for GeminiLiveConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

impl GeminiLiveConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            url: GEMINI_LIVE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Model resource name as expected by the `setup` message.
    pub fn model_resource(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    /// Endpoint URL with the API key attached.
    pub fn ws_url(&self) -> LiveResult<url::Url> {
        if self.api_key.is_empty() {
            return Err(LiveError::AuthenticationFailed(
                "Gemini API key is not configured".to_string(),
            ));
        }
        let mut url = url::Url::parse(&self.url).map_err(|e| {
            LiveError::InvalidConfiguration(format!("Invalid Gemini Live URL {}: {e}", self.url))
        })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}
