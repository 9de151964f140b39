//! Derives span records from live backend events.

use tracing::debug;

use super::{SpanRecord, Telemetry};
use crate::core::live::{LiveEvent, Part};

/// Per-session event monitor.
///
/// Span names:
/// - `after_model_callback` - final model text or agent speech transcript
/// - `before_agent_callback` - any caller transcription
/// - `before_model_callback` - final caller transcription
/// - `after_agent_callback` - turn complete or interrupted
/// - `usage_metadata` - token counts
#[derive(Debug, Clone)]
pub struct LiveEventMonitor {
    telemetry: Telemetry,
    conversation_id: String,
    agent_name: String,
}

impl LiveEventMonitor {
    pub fn new(
        telemetry: Telemetry,
        conversation_id: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            telemetry,
            conversation_id: conversation_id.into(),
            agent_name: agent_name.into(),
        }
    }

    fn span(&self, name: &'static str) -> SpanRecord {
        SpanRecord::new(name)
            .with("conversation_id", self.conversation_id.as_str())
            .with("agent_name", self.agent_name.as_str())
            .with("invocation_id", self.conversation_id.as_str())
    }

    pub fn observe(&self, event: &LiveEvent) {
        match event {
            LiveEvent::Content { content, partial } => {
                if !*partial && content.has_text() {
                    let mut span = self.span("after_model_callback");
                    if let Some(text) = content.first_part().and_then(Part::text) {
                        span = span.with("llm_response.content.parts.0.text", text);
                    }
                    self.telemetry.record(span);
                }
            }
            LiveEvent::OutputTranscription(t) => {
                debug!(
                    conversation_id = %self.conversation_id,
                    partial = t.partial,
                    "Agent speech: {}", t.text
                );
                if !t.partial && !t.text.is_empty() {
                    self.telemetry.record(
                        self.span("after_model_callback")
                            .with("llm_response.content.parts.0.text", t.text.as_str()),
                    );
                }
            }
            LiveEvent::InputTranscription(t) => {
                if t.text.is_empty() {
                    return;
                }
                debug!(
                    conversation_id = %self.conversation_id,
                    partial = t.partial,
                    "User speech: {}", t.text
                );
                self.telemetry.record(self.span("before_agent_callback"));
                if !t.partial {
                    self.telemetry.record(
                        self.span("before_model_callback")
                            .with("user_content.parts.0.text", t.text.as_str())
                            .with("user_content.role", "user"),
                    );
                }
            }
            LiveEvent::Turn(signal) => {
                if signal.turn_complete {
                    self.telemetry
                        .record(self.span("after_agent_callback").with("turn_complete", true));
                }
                if signal.interrupted {
                    self.telemetry
                        .record(self.span("after_agent_callback").with("interrupted", true));
                }
            }
            LiveEvent::Usage(usage) => {
                debug!(
                    conversation_id = %self.conversation_id,
                    prompt_tokens = usage.prompt_token_count,
                    response_tokens = usage.response_token_count,
                    total_tokens = usage.total_token_count,
                    "Usage metadata"
                );
                self.telemetry.record(
                    self.span("usage_metadata")
                        .with(
                            "llm_response.usage_metadata.total_token_count",
                            usage.total_token_count,
                        )
                        .with(
                            "llm_response.usage_metadata.prompt_token_count",
                            usage.prompt_token_count,
                        )
                        .with(
                            "llm_response.usage_metadata.candidates_token_count",
                            usage.response_token_count,
                        ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::live::{
        Blob, Content, Transcription, TurnSignal, UsageMetadata,
    };
    use crate::core::telemetry::{AttributeValue, RecordingSink};

    async fn observe_all(events: &[LiveEvent]) -> RecordingSink {
        let sink = RecordingSink::new();
        let (telemetry, handle) = Telemetry::spawn(Arc::new(sink.clone()));
        let monitor = LiveEventMonitor::new(telemetry, "conv-1", "gemini");
        for event in events {
            monitor.observe(event);
        }
        drop(monitor);
        handle.await.unwrap();
        sink
    }

    #[tokio::test]
    async fn test_user_transcription_spans() {
        let sink = observe_all(&[
            LiveEvent::InputTranscription(Transcription::partial("Hal")),
            LiveEvent::InputTranscription(Transcription::complete("Hallo")),
            LiveEvent::InputTranscription(Transcription::partial("")),
        ])
        .await;
        assert_eq!(
            sink.names(),
            vec![
                "before_agent_callback",
                "before_agent_callback",
                "before_model_callback"
            ]
        );
        let records = sink.records();
        assert_eq!(
            records[2].attribute("user_content.parts.0.text"),
            Some(&AttributeValue::Str("Hallo".to_string()))
        );
        assert_eq!(
            records[0].attribute("conversation_id"),
            Some(&AttributeValue::Str("conv-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_model_output_spans() {
        let sink = observe_all(&[
            LiveEvent::OutputTranscription(Transcription::partial("Guten")),
            LiveEvent::OutputTranscription(Transcription::complete("Guten Tag")),
            LiveEvent::Content {
                content: Content::model(Part::Text("Guten Tag".to_string())),
                partial: false,
            },
            LiveEvent::Content {
                content: Content::model(Part::InlineData(Blob::pcm(vec![0u8; 4]))),
                partial: true,
            },
        ])
        .await;
        assert_eq!(
            sink.names(),
            vec!["after_model_callback", "after_model_callback"]
        );
    }

    #[tokio::test]
    async fn test_turn_and_usage_spans() {
        let sink = observe_all(&[
            LiveEvent::Turn(TurnSignal {
                turn_complete: true,
                interrupted: true,
            }),
            LiveEvent::Usage(UsageMetadata {
                prompt_token_count: 1,
                response_token_count: 2,
                total_token_count: 3,
            }),
        ])
        .await;
        assert_eq!(
            sink.names(),
            vec!["after_agent_callback", "after_agent_callback", "usage_metadata"]
        );
        let usage = &sink.records()[2];
        assert_eq!(
            usage.attribute("llm_response.usage_metadata.total_token_count"),
            Some(&AttributeValue::Int(3))
        );
    }

    #[test]
    fn test_disabled_monitor_is_noop() {
        let monitor = LiveEventMonitor::new(Telemetry::disabled(), "c", "a");
        monitor.observe(&LiveEvent::Turn(TurnSignal::default()));
    }
}
