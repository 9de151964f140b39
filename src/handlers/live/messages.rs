//! Live WebSocket message types
//!
//! Every message is a single JSON object in a text frame:
//!
//! ```text
//! {"mime_type":"text/plain","data":"<string>"}                        // text, both directions
//! {"mime_type":"text/plain","data":"<string>","is_user_input":true}   // live caption of caller speech
//! {"mime_type":"audio/pcm","data":"<base64>"}                         // raw PCM audio, both directions
//! {"turn_complete":<bool>,"interrupted":<bool>}                       // turn signal, outbound only
//! ```
//!
//! The codec is pure: no I/O, no state.

use axum::extract::ws::close_code;
use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::live::TurnSignal;

/// MIME type of text messages.
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// MIME type of raw PCM audio messages.
pub const AUDIO_MIME_TYPE: &str = "audio/pcm";

// =============================================================================
// Errors
// =============================================================================

/// Wire decode/encode failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Not a JSON object with string `mime_type` and `data`
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// `mime_type` is neither text nor audio
    #[error("Unsupported mime type: {0}")]
    UnsupportedMimeType(String),

    /// Audio payload is not valid base64
    #[error("Invalid base64 audio payload: {0}")]
    InvalidAudio(String),

    /// Binary WebSocket frame; only JSON text frames are accepted
    #[error("Binary frames are not supported")]
    BinaryFrame,

    /// Outbound message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(String),
}

impl CodecError {
    /// Machine-readable code used in error frames.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Malformed(_) => "malformed_message",
            CodecError::UnsupportedMimeType(_) => "unsupported_mime_type",
            CodecError::InvalidAudio(_) => "invalid_audio",
            CodecError::BinaryFrame => "binary_frame",
            CodecError::Encode(_) => "encode_failed",
        }
    }

    /// WebSocket close code reported when this error ends a connection.
    pub fn close_code(&self) -> u16 {
        match self {
            CodecError::UnsupportedMimeType(_) | CodecError::BinaryFrame => close_code::UNSUPPORTED,
            CodecError::Malformed(_) | CodecError::InvalidAudio(_) => close_code::INVALID,
            CodecError::Encode(_) => close_code::ERROR,
        }
    }
}

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Raw inbound message as sent by the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientMessage {
    pub mime_type: String,
    pub data: String,
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Committed user text
    Text(String),
    /// Raw PCM audio bytes
    Audio(Bytes),
}

/// Decode one inbound text frame.
pub fn decode_client_message(text: &str) -> Result<InboundFrame, CodecError> {
    let message: ClientMessage =
        serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))?;

    match message.mime_type.as_str() {
        TEXT_MIME_TYPE => Ok(InboundFrame::Text(message.data)),
        AUDIO_MIME_TYPE => decode_audio(&message.data).map(InboundFrame::Audio),
        other => Err(CodecError::UnsupportedMimeType(other.to_string())),
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Error payload of an error frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Outbound WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Text or audio payload
    Media {
        mime_type: String,
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_user_input: Option<bool>,
    },

    /// Turn completion or interruption
    Control { turn_complete: bool, interrupted: bool },

    /// Sent before closing only when error frames are enabled
    Error { error: ErrorBody },
}

impl ServerMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ServerMessage::Media {
            mime_type: TEXT_MIME_TYPE.to_string(),
            data: text.into(),
            is_user_input: None,
        }
    }

    /// Live caption of the caller's own speech.
    pub fn user_caption(text: impl Into<String>) -> Self {
        ServerMessage::Media {
            mime_type: TEXT_MIME_TYPE.to_string(),
            data: text.into(),
            is_user_input: Some(true),
        }
    }

    pub fn audio(data: &[u8]) -> Self {
        ServerMessage::Media {
            mime_type: AUDIO_MIME_TYPE.to_string(),
            data: encode_audio(data),
            is_user_input: None,
        }
    }

    pub fn control(signal: TurnSignal) -> Self {
        ServerMessage::Control {
            turn_complete: signal.turn_complete,
            interrupted: signal.interrupted,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Media { mime_type, .. } if mime_type == AUDIO_MIME_TYPE => "audio",
            ServerMessage::Media { .. } => "text",
            ServerMessage::Control { .. } => "control",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// Serialize an outbound message to its JSON text.
pub fn encode_server_message(message: &ServerMessage) -> Result<String, CodecError> {
    serde_json::to_string(message).map_err(|e| CodecError::Encode(e.to_string()))
}

// =============================================================================
// Audio Payloads
// =============================================================================

pub fn encode_audio(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

pub fn decode_audio(data: &str) -> Result<Bytes, CodecError> {
    BASE64_STANDARD
        .decode(data)
        .map(Bytes::from)
        .map_err(|e| CodecError::InvalidAudio(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_message() {
        let frame = decode_client_message(r#"{"mime_type":"text/plain","data":"Hallo"}"#)
            .expect("Should decode");
        assert_eq!(frame, InboundFrame::Text("Hallo".to_string()));
    }

    #[test]
    fn test_decode_audio_message() {
        let frame = decode_client_message(r#"{"mime_type":"audio/pcm","data":"AAEC/w=="}"#)
            .expect("Should decode");
        assert_eq!(frame, InboundFrame::Audio(Bytes::from_static(&[0, 1, 2, 255])));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let frame = decode_client_message(
            r#"{"mime_type":"text/plain","data":"hi","is_user_input":true,"partial":false}"#,
        )
        .expect("Should decode");
        assert_eq!(frame, InboundFrame::Text("hi".to_string()));
    }

    #[test]
    fn test_decode_unsupported_mime_type() {
        let err = decode_client_message(r#"{"mime_type":"video/mp4","data":""}"#).unwrap_err();
        assert_eq!(err, CodecError::UnsupportedMimeType("video/mp4".to_string()));
        assert_eq!(err.close_code(), 1003);
        assert_eq!(err.code(), "unsupported_mime_type");
    }

    #[test]
    fn test_decode_audio_with_rate_is_unsupported() {
        let err = decode_client_message(r#"{"mime_type":"audio/pcm;rate=16000","data":""}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedMimeType(_)));
    }

    #[test]
    fn test_decode_malformed() {
        for input in [
            "not json",
            r#"{"data":"x"}"#,
            r#"{"mime_type":"text/plain"}"#,
            r#"{"mime_type":"text/plain","data":5}"#,
            r#"[1,2,3]"#,
        ] {
            let err = decode_client_message(input).unwrap_err();
            assert!(matches!(err, CodecError::Malformed(_)), "input: {input}");
            assert_eq!(err.close_code(), 1007);
        }
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_client_message(r#"{"mime_type":"audio/pcm","data":"@@@"}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidAudio(_)));
    }

    #[test]
    fn test_empty_text_is_preserved_inbound() {
        let frame =
            decode_client_message(r#"{"mime_type":"text/plain","data":""}"#).expect("decode");
        assert_eq!(frame, InboundFrame::Text(String::new()));
    }

    #[test]
    fn test_encode_text_message() {
        let json = encode_server_message(&ServerMessage::text("Guten Tag")).unwrap();
        assert_eq!(json, r#"{"mime_type":"text/plain","data":"Guten Tag"}"#);
    }

    #[test]
    fn test_encode_user_caption() {
        let json = encode_server_message(&ServerMessage::user_caption("Hallo")).unwrap();
        assert_eq!(
            json,
            r#"{"mime_type":"text/plain","data":"Hallo","is_user_input":true}"#
        );
    }

    #[test]
    fn test_encode_audio_message() {
        let json = encode_server_message(&ServerMessage::audio(&[0, 1, 2, 3])).unwrap();
        assert_eq!(json, r#"{"mime_type":"audio/pcm","data":"AAECAw=="}"#);
    }

    #[test]
    fn test_encode_control_message() {
        let json = encode_server_message(&ServerMessage::control(TurnSignal {
            turn_complete: true,
            interrupted: false,
        }))
        .unwrap();
        assert_eq!(json, r#"{"turn_complete":true,"interrupted":false}"#);
    }

    #[test]
    fn test_encode_error_message() {
        let json =
            encode_server_message(&ServerMessage::error("backend_error", "session lost")).unwrap();
        assert_eq!(
            json,
            r#"{"error":{"code":"backend_error","message":"session lost"}}"#
        );
    }

    #[test]
    fn test_server_message_deserializes_back() {
        let message: ServerMessage =
            serde_json::from_str(r#"{"turn_complete":false,"interrupted":true}"#).unwrap();
        assert_eq!(
            message,
            ServerMessage::Control {
                turn_complete: false,
                interrupted: true
            }
        );
        assert_eq!(message.kind(), "control");
        assert_eq!(ServerMessage::audio(&[1]).kind(), "audio");
        assert_eq!(ServerMessage::user_caption("x").kind(), "text");
    }

    #[test]
    fn test_audio_round_trip_edge_cases() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        for data in [Vec::new(), vec![0u8], vec![0xff; 3], all_bytes] {
            assert_eq!(decode_audio(&encode_audio(&data)).unwrap().as_ref(), &data[..]);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn audio_round_trip(data in any::<Vec<u8>>()) {
                let decoded = decode_audio(&encode_audio(&data)).unwrap();
                prop_assert_eq!(decoded.as_ref(), &data[..]);
            }

            #[test]
            fn client_audio_message_round_trip(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
                let json = format!(
                    r#"{{"mime_type":"audio/pcm","data":"{}"}}"#,
                    encode_audio(&data)
                );
                let frame = decode_client_message(&json).unwrap();
                prop_assert_eq!(frame, InboundFrame::Audio(Bytes::from(data)));
            }

            #[test]
            fn outbound_audio_decodes_to_input(data in proptest::collection::vec(any::<u8>(), 1..4096)) {
                let json = encode_server_message(&ServerMessage::audio(&data)).unwrap();
                let message: ServerMessage = serde_json::from_str(&json).unwrap();
                match message {
                    ServerMessage::Media { mime_type, data: payload, is_user_input } => {
                        prop_assert_eq!(mime_type, AUDIO_MIME_TYPE);
                        prop_assert_eq!(is_user_input, None);
                        let decoded = decode_audio(&payload).unwrap();
                        prop_assert_eq!(decoded.as_ref(), &data[..]);
                    }
                    other => prop_assert!(false, "unexpected message {:?}", other),
                }
            }
        }
    }
}
