//! Translation of Gemini server frames into [`LiveEvent`]s.
//!
//! The Live API streams transcriptions as delta chunks. Each chunk is emitted
//! as a partial event and accumulated; the accumulated text is emitted once as
//! a final event when the transcript is complete. Final text is always the
//! concatenation of its partial chunks, so it never retracts.

use tracing::{debug, warn};

use super::messages::{ServerContent, ServerMessage, WirePart};
use crate::core::live::base::{Content, LiveEvent, Part, Transcription, TurnSignal};

/// Per-session translation state.
#[derive(Debug, Default)]
pub struct EventTranslator {
    input_transcript: String,
    output_transcript: String,
    model_text: String,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one server frame, appending the resulting events to `out`.
    pub fn translate(&mut self, message: ServerMessage, out: &mut Vec<LiveEvent>) {
        if let Some(content) = message.server_content {
            self.translate_content(content, out);
        }

        if let Some(usage) = message.usage_metadata {
            out.push(LiveEvent::Usage(usage.into()));
        }

        if let Some(tool_call) = message.tool_call {
            warn!(tool_call = %tool_call, "Ignoring Gemini tool call, no tools are registered");
        }

        if let Some(go_away) = message.go_away {
            warn!(time_left = ?go_away.time_left, "Gemini Live server announced disconnect");
        }

        if let Some(update) = message.session_resumption_update {
            debug!(
                resumable = update.resumable,
                has_handle = update.new_handle.is_some(),
                "Gemini session resumption update"
            );
        }
    }

    fn translate_content(&mut self, content: ServerContent, out: &mut Vec<LiveEvent>) {
        if let Some(transcription) = content.input_transcription {
            if !transcription.text.is_empty() {
                self.input_transcript.push_str(&transcription.text);
                out.push(LiveEvent::InputTranscription(Transcription::partial(
                    transcription.text,
                )));
            }
            if transcription.finished {
                Self::flush_input(&mut self.input_transcript, out);
            }
        }

        if let Some(model_turn) = content.model_turn {
            // The caller's utterance is over once the model starts answering.
            Self::flush_input(&mut self.input_transcript, out);

            for part in model_turn.parts {
                if let Some(event) = self.translate_part(part) {
                    out.push(event);
                }
            }
        }

        if let Some(transcription) = content.output_transcription {
            if !transcription.text.is_empty() {
                self.output_transcript.push_str(&transcription.text);
                out.push(LiveEvent::OutputTranscription(Transcription::partial(
                    transcription.text,
                )));
            }
            if transcription.finished {
                Self::flush_output(&mut self.output_transcript, out);
            }
        }

        if content.turn_complete || content.interrupted {
            // On barge-in the caller is still talking; their utterance stays open.
            if content.turn_complete {
                Self::flush_input(&mut self.input_transcript, out);
            }
            Self::flush_output(&mut self.output_transcript, out);
            if !self.model_text.is_empty() {
                let text = std::mem::take(&mut self.model_text);
                out.push(LiveEvent::Content {
                    content: Content::model(Part::Text(text)),
                    partial: false,
                });
            }
            out.push(LiveEvent::Turn(TurnSignal {
                turn_complete: content.turn_complete,
                interrupted: content.interrupted,
            }));
        }
    }

    fn translate_part(&mut self, part: WirePart) -> Option<LiveEvent> {
        if part.thought.unwrap_or(false) {
            return None;
        }

        if let Some(blob) = part.inline_data {
            return match blob.decode() {
                Ok(blob) => Some(LiveEvent::Content {
                    content: Content::model(Part::InlineData(blob)),
                    partial: true,
                }),
                Err(e) => {
                    warn!("Dropping undecodable inline data: {}", e);
                    None
                }
            };
        }

        match part.text {
            Some(text) if !text.is_empty() => {
                self.model_text.push_str(&text);
                Some(LiveEvent::Content {
                    content: Content::model(Part::Text(text)),
                    partial: true,
                })
            }
            _ => None,
        }
    }

    fn flush_input(buffer: &mut String, out: &mut Vec<LiveEvent>) {
        if !buffer.is_empty() {
            out.push(LiveEvent::InputTranscription(Transcription::complete(
                std::mem::take(buffer),
            )));
        }
    }

    fn flush_output(buffer: &mut String, out: &mut Vec<LiveEvent>) {
        if !buffer.is_empty() {
            out.push(LiveEvent::OutputTranscription(Transcription::complete(
                std::mem::take(buffer),
            )));
        }
    }
}
