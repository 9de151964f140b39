//! Scripted live backend and in-memory client transport for session tests.
//!
//! `ScriptedBackend` plays a fixed list of steps on every session it opens and
//! records every request the session receives. `client_transport` builds the
//! channel pair the coordinator reads from and writes to in place of a real
//! WebSocket.

#![allow(dead_code)]

pub mod gemini_mock;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::Message;
use futures::channel::mpsc as fmpsc;
use tokio::sync::mpsc;

use live_voice_gateway::core::live::{
    LiveBackend, LiveError, LiveEvent, LiveEventSender, LiveRequest, LiveRequestQueue,
    LiveResult, LiveSession, SessionRequest, event_channel,
};

/// One step of a backend script.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit an event
    Emit(LiveEvent),
    /// Emit a backend fault
    Fail(String),
    /// Wait until the session receives one more content or audio request
    AwaitRequest,
    Sleep(Duration),
}

/// What the session does once its script has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    /// End the event sequence
    End,
    /// Keep the session open until the queue is closed
    HoldOpen,
    /// Never end the event sequence, even after close
    Hang,
}

/// Everything a scripted session observed.
#[derive(Debug, Default)]
pub struct Recorded {
    pub requests: Mutex<Vec<LiveRequest>>,
    pub sessions: Mutex<Vec<SessionRequest>>,
    pub closes: AtomicUsize,
}

impl Recorded {
    pub fn requests(&self) -> Vec<LiveRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Wait up to one second for the session to see its close request.
    pub async fn wait_for_close(&self) -> usize {
        for _ in 0..100 {
            if self.close_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.close_count()
    }

    pub fn opened(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

/// Backend replaying a script for every session.
pub struct ScriptedBackend {
    steps: Vec<Step>,
    after: AfterScript,
    open_error: Option<String>,
    pub recorded: Arc<Recorded>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>, after: AfterScript) -> Self {
        Self {
            steps,
            after,
            open_error: None,
            recorded: Arc::new(Recorded::default()),
        }
    }

    /// Backend whose `open` always fails.
    pub fn failing(message: &str) -> Self {
        let mut backend = Self::new(Vec::new(), AfterScript::End);
        backend.open_error = Some(message.to_string());
        backend
    }
}

#[async_trait]
impl LiveBackend for ScriptedBackend {
    async fn open(&self, request: SessionRequest) -> LiveResult<LiveSession> {
        if let Some(message) = &self.open_error {
            return Err(LiveError::ConnectionFailed(message.clone()));
        }

        let (events_tx, events_rx) = event_channel(request.event_buffer);
        let (queue, requests_rx) = LiveRequestQueue::new();
        self.recorded.sessions.lock().unwrap().push(request);

        tokio::spawn(play(
            self.steps.clone(),
            self.after,
            requests_rx,
            events_tx,
            self.recorded.clone(),
        ));
        Ok(LiveSession::new(
            format!("scripted-{}", self.recorded.opened()),
            events_rx,
            queue,
        ))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn record(recorded: &Recorded, request: LiveRequest) -> bool {
    let is_close = request == LiveRequest::Close;
    if is_close {
        recorded.closes.fetch_add(1, Ordering::SeqCst);
    }
    recorded.requests.lock().unwrap().push(request);
    is_close
}

async fn play(
    steps: Vec<Step>,
    after: AfterScript,
    mut requests: mpsc::UnboundedReceiver<LiveRequest>,
    events: LiveEventSender,
    recorded: Arc<Recorded>,
) {
    for step in steps {
        match step {
            Step::Emit(event) => {
                if events.send(Ok(event)).await.is_err() {
                    return;
                }
            }
            Step::Fail(message) => {
                let _ = events.send(Err(LiveError::ProviderError(message))).await;
            }
            Step::AwaitRequest => match requests.recv().await {
                Some(request) => {
                    if record(&recorded, request) {
                        return;
                    }
                }
                None => return,
            },
            Step::Sleep(duration) => tokio::time::sleep(duration).await,
        }
    }

    match after {
        AfterScript::End => {
            drop(events);
            // Keep recording what arrives after the sequence ended.
            while let Some(request) = requests.recv().await {
                if record(&recorded, request) {
                    break;
                }
            }
        }
        AfterScript::HoldOpen => {
            while let Some(request) = requests.recv().await {
                if record(&recorded, request) {
                    break;
                }
            }
        }
        AfterScript::Hang => {
            while let Some(request) = requests.recv().await {
                record(&recorded, request);
            }
            std::future::pending::<()>().await;
            drop(events);
        }
    }
}

/// Client side of an in-memory transport.
pub struct ClientEnd {
    /// Frames the client sends to the gateway
    pub tx: fmpsc::UnboundedSender<Result<Message, axum::Error>>,
    /// Frames the gateway writes to the client
    pub rx: fmpsc::UnboundedReceiver<Message>,
}

/// Build `(sink, source)` for the coordinator plus the client end.
pub fn client_transport() -> (
    fmpsc::UnboundedSender<Message>,
    fmpsc::UnboundedReceiver<Result<Message, axum::Error>>,
    ClientEnd,
) {
    let (client_tx, source) = fmpsc::unbounded();
    let (sink, client_rx) = fmpsc::unbounded();
    (
        sink,
        source,
        ClientEnd {
            tx: client_tx,
            rx: client_rx,
        },
    )
}

impl ClientEnd {
    pub fn send_json(&self, json: &str) {
        self.tx
            .unbounded_send(Ok(Message::Text(json.to_string().into())))
            .unwrap();
    }

    /// Drain everything written so far, as `(texts, close)` once the gateway
    /// is done with the sink.
    pub async fn collect(mut self) -> (Vec<String>, Option<u16>) {
        use futures::StreamExt;

        let mut texts = Vec::new();
        let mut close = None;
        while let Some(message) = self.rx.next().await {
            match message {
                Message::Text(text) => texts.push(text.as_str().to_string()),
                Message::Close(frame) => close = frame.map(|f| f.code),
                _ => {}
            }
        }
        (texts, close)
    }
}
