//! Mock Gemini Live server.
//!
//! Accepts WebSocket connections on a local port, records every client frame
//! as JSON and answers the first client turn with a scripted list of server
//! frames.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

/// How the mock behaves during the setup handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupBehavior {
    /// Answer with `setupComplete`
    Complete,
    /// Never answer
    Silent,
    /// Close the connection instead of answering
    Close,
}

/// Running mock server.
pub struct GeminiMock {
    pub addr: SocketAddr,
    /// Every client frame, setup included, in arrival order
    pub received: Arc<Mutex<Vec<Value>>>,
}

impl GeminiMock {
    /// Start a mock that answers the first non-setup client frame with
    /// `replies`, sent as binary frames when `binary` is set.
    pub async fn start(replies: Vec<Value>, setup: SetupBehavior, binary: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let recorded = received.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let replies = replies.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let (mut sink, mut source) = ws.split();
                    let mut answered = false;

                    while let Some(Ok(frame)) = source.next().await {
                        let text = match frame {
                            Message::Text(text) => text.as_str().to_string(),
                            Message::Close(_) => break,
                            _ => continue,
                        };
                        let Ok(json) = serde_json::from_str::<Value>(&text) else {
                            continue;
                        };
                        let is_setup = json.get("setup").is_some();
                        recorded.lock().unwrap().push(json);

                        if is_setup {
                            match setup {
                                SetupBehavior::Complete => {
                                    let _ = sink
                                        .send(Message::Text(r#"{"setupComplete":{}}"#.into()))
                                        .await;
                                }
                                SetupBehavior::Silent => {
                                    tokio::time::sleep(Duration::from_secs(30)).await;
                                }
                                SetupBehavior::Close => {
                                    let _ = sink.send(Message::Close(None)).await;
                                    return;
                                }
                            }
                            continue;
                        }

                        if !answered {
                            answered = true;
                            for reply in &replies {
                                let payload = reply.to_string();
                                let frame = if binary {
                                    Message::Binary(payload.into_bytes().into())
                                } else {
                                    Message::Text(payload.into())
                                };
                                if sink.send(frame).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self { addr, received }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws/live", self.addr)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}
