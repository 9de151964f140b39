//! Gemini Live API WebSocket message types.
//!
//! All messages are JSON objects keyed by their message kind.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - Session configuration, must be the first message
//! - clientContent - Committed conversation turns
//! - realtimeInput - Streaming audio chunks
//!
//! Server messages (received from server):
//! - setupComplete - Setup acknowledged
//! - serverContent - Model output, transcriptions and turn signals
//! - usageMetadata - Token accounting
//! - toolCall - Function call request
//! - goAway - Server will disconnect soon
//! - sessionResumptionUpdate - New resumption handle

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::GEMINI_INPUT_SAMPLE_RATE;
use crate::core::live::base::{
    Blob, Content, LiveError, LiveResult, Modality, Part, PCM_MIME_TYPE, RunConfig, UsageMetadata,
};

// =============================================================================
// Setup
// =============================================================================

/// Session setup, sent once right after connecting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Model resource name (`models/...`)
    pub model: String,

    pub generation_config: GenerationConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,

    /// Presence enables transcription of the caller's audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,

    /// Presence enables transcription of the model's audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<TranscriptionConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumptionConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<Modality>,
    pub speech_config: WireSpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSpeechConfig {
    pub voice_config: VoiceConfig,
    pub language_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Empty object; the field's presence is the switch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptionConfig {}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionResumptionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

impl Setup {
    pub fn from_run_config(model: String, run_config: &RunConfig) -> Self {
        Self {
            model,
            generation_config: GenerationConfig {
                response_modalities: run_config.response_modalities.clone(),
                speech_config: WireSpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: run_config.speech.voice_name.clone(),
                        },
                    },
                    language_code: run_config.speech.language_code.clone(),
                },
            },
            system_instruction: run_config.instructions.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart::text(text.clone())],
            }),
            input_audio_transcription: run_config
                .input_audio_transcription
                .then(TranscriptionConfig::default),
            output_audio_transcription: run_config
                .output_audio_transcription
                .then(TranscriptionConfig::default),
            session_resumption: run_config
                .session_resumption
                .then(SessionResumptionConfig::default),
        }
    }
}

// =============================================================================
// Content
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<WireBlob>,
    /// Set on reasoning parts that are not meant for the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl WirePart {
    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }
}

/// Base64-encoded inline data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBlob {
    pub mime_type: String,
    pub data: String,
}

impl WireBlob {
    /// Encode an audio blob, tagging bare PCM with the input sample rate.
    pub fn from_blob(blob: &Blob) -> Self {
        let mime_type = if blob.mime_type == PCM_MIME_TYPE {
            format!("{PCM_MIME_TYPE};rate={GEMINI_INPUT_SAMPLE_RATE}")
        } else {
            blob.mime_type.clone()
        };
        Self {
            mime_type,
            data: BASE64_STANDARD.encode(&blob.data),
        }
    }

    pub fn decode(&self) -> LiveResult<Blob> {
        let data = BASE64_STANDARD.decode(&self.data).map_err(|e| {
            LiveError::SerializationError(format!("Invalid base64 inline data: {e}"))
        })?;
        Ok(Blob {
            mime_type: self.mime_type.clone(),
            data: data.into(),
        })
    }
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let parts = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::text(text.clone()),
                Part::InlineData(blob) => WirePart {
                    inline_data: Some(WireBlob::from_blob(blob)),
                    ..Default::default()
                },
            })
            .collect();
        Self {
            role: Some(content.role.clone()),
            parts,
        }
    }
}

// =============================================================================
// Client Messages (sent to server)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    ClientContent(ClientContent),
    RealtimeInput(RealtimeInput),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<WireContent>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub audio: WireBlob,
}

impl ClientMessage {
    /// A single committed turn.
    pub fn content(content: &Content) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![content.into()],
            turn_complete: true,
        })
    }

    pub fn audio(blob: &Blob) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: WireBlob::from_blob(blob),
        })
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// One server frame. Exactly one field is normally populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub usage_metadata: Option<WireUsageMetadata>,
    #[serde(default)]
    pub tool_call: Option<serde_json::Value>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
    #[serde(default)]
    pub session_resumption_update: Option<SessionResumptionUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<WireContent>,
    #[serde(default)]
    pub input_transcription: Option<WireTranscription>,
    #[serde(default)]
    pub output_transcription: Option<WireTranscription>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub generation_complete: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTranscription {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub response_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<WireUsageMetadata> for UsageMetadata {
    fn from(usage: WireUsageMetadata) -> Self {
        Self {
            prompt_token_count: usage.prompt_token_count,
            response_token_count: usage.response_token_count,
            total_token_count: usage.total_token_count,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    #[serde(default)]
    pub new_handle: Option<String>,
    #[serde(default)]
    pub resumable: bool,
}

impl ServerMessage {
    pub fn parse(bytes: &[u8]) -> LiveResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| LiveError::SerializationError(format!("Invalid server message: {e}")))
    }
}

// =============================================================================
// Tests
// =============================================================================
