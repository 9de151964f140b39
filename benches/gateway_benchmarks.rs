//! Performance benchmarks for the live voice gateway
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use base64::{Engine, prelude::BASE64_STANDARD};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;

use live_voice_gateway::core::live::gemini::{EventTranslator, ServerMessage as GeminiFrame};
use live_voice_gateway::core::live::{
    Blob, Content, LiveEvent, LoopbackBackend, Part, Transcription, TurnSignal,
};
use live_voice_gateway::handlers::live::{
    ServerMessage, classify_event, decode_client_message, encode_server_message,
};

/// 20ms of 16kHz mono PCM16
const FRAME_20MS: usize = 640;

/// Benchmark client frame decoding
fn bench_client_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("client_decoding");
    group.measurement_time(Duration::from_secs(5));

    let text = r#"{"mime_type":"text/plain","data":"Wie wird das Wetter morgen in Berlin?"}"#;
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_with_input(BenchmarkId::new("text", text.len()), &text, |b, msg| {
        b.iter(|| decode_client_message(black_box(msg)))
    });

    for frames in [1usize, 5, 25] {
        let pcm = vec![0x7fu8; FRAME_20MS * frames];
        let msg = format!(
            r#"{{"mime_type":"audio/pcm","data":"{}"}}"#,
            BASE64_STANDARD.encode(&pcm)
        );
        group.throughput(Throughput::Bytes(msg.len() as u64));
        group.bench_with_input(BenchmarkId::new("audio", pcm.len()), &msg, |b, msg| {
            b.iter(|| decode_client_message(black_box(msg)))
        });
    }

    group.finish();
}

/// Benchmark classification plus encoding of backend events
fn bench_event_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_encoding");
    group.measurement_time(Duration::from_secs(5));

    let events = [
        (
            "caption",
            LiveEvent::InputTranscription(Transcription::partial("Wie wird das Wetter")),
        ),
        (
            "audio_chunk",
            LiveEvent::Content {
                content: Content::model(Part::InlineData(Blob {
                    mime_type: "audio/pcm;rate=24000".to_string(),
                    data: vec![0x11u8; 960].into(),
                })),
                partial: true,
            },
        ),
        (
            "turn",
            LiveEvent::Turn(TurnSignal {
                turn_complete: true,
                interrupted: false,
            }),
        ),
        (
            "final_transcript",
            LiveEvent::OutputTranscription(Transcription::complete("Morgen wird es sonnig.")),
        ),
    ];

    for (name, event) in &events {
        group.bench_with_input(BenchmarkId::new("classify_encode", name), event, |b, event| {
            b.iter(|| classify_event(black_box(event)).map(|m| encode_server_message(&m)))
        });
    }

    let control = ServerMessage::control(TurnSignal {
        turn_complete: false,
        interrupted: true,
    });
    group.bench_function("encode_control", |b| {
        b.iter(|| encode_server_message(black_box(&control)))
    });

    group.finish();
}

/// Benchmark Gemini frame parsing and translation
fn bench_gemini_translation(c: &mut Criterion) {
    let mut group = c.benchmark_group("gemini_translation");
    group.measurement_time(Duration::from_secs(5));

    let transcript = br#"{"serverContent":{"outputTranscription":{"text":"Morgen wird es"}}}"#;
    let audio = format!(
        r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{}"}}}}]}}}}}}"#,
        BASE64_STANDARD.encode(vec![0x22u8; 960])
    );
    let turn = br#"{"serverContent":{"turnComplete":true}}"#;

    let frames: [(&str, &[u8]); 3] = [
        ("transcript", transcript),
        ("audio", audio.as_bytes()),
        ("turn_complete", turn),
    ];

    for (name, frame) in frames {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse_translate", name), frame, |b, frame| {
            let mut translator = EventTranslator::new();
            let mut out = Vec::with_capacity(4);
            b.iter(|| {
                if let Ok(message) = GeminiFrame::parse(black_box(frame)) {
                    translator.translate(message, &mut out);
                }
                out.clear();
            })
        });
    }

    group.finish();
}

/// Benchmark loopback reply generation
fn bench_loopback_replies(c: &mut Criterion) {
    let mut group = c.benchmark_group("loopback_replies");

    let sentence = "Wie wird das Wetter morgen in Berlin und in Hamburg";
    group.bench_function("reply_to_text", |b| {
        b.iter(|| LoopbackBackend::reply_to_text(black_box(sentence)))
    });

    let pcm = vec![0u8; FRAME_20MS];
    group.bench_function("reply_to_audio", |b| {
        b.iter(|| LoopbackBackend::reply_to_audio(Blob::pcm(black_box(pcm.clone()))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_client_decoding,
    bench_event_encoding,
    bench_gemini_translation,
    bench_loopback_replies,
);

criterion_main!(benches);
