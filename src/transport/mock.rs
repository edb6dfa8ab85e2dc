//! In-memory connector for exercising the connection manager without a network.

use super::{CloseInfo, Connector, Frame, Transport};
use crate::types::{RealtimeError, Result};
use futures::future::BoxFuture;
use futures::{sink, stream};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;

struct MockShared {
    urls: Mutex<Vec<Url>>,
    refuse_next: Mutex<u32>,
    refuse_all: Mutex<bool>,
    sessions_tx: mpsc::UnboundedSender<MockSession>,
    sessions_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockSession>>,
}

/// Records every connect attempt and hands accepted transports to the test as [`MockSession`]s.
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<MockShared>,
}

impl MockConnector {
    pub fn new() -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(MockShared {
                urls: Mutex::new(Vec::new()),
                refuse_next: Mutex::new(0),
                refuse_all: Mutex::new(false),
                sessions_tx,
                sessions_rx: tokio::sync::Mutex::new(sessions_rx),
            }),
        }
    }

    /// Fails the next `count` connect attempts
    pub fn refuse_next(&self, count: u32) {
        *self.shared.refuse_next.lock().unwrap() = count;
    }

    pub fn refuse_all(&self) {
        *self.shared.refuse_all.lock().unwrap() = true;
    }

    pub fn accept_all(&self) {
        *self.shared.refuse_all.lock().unwrap() = false;
        *self.shared.refuse_next.lock().unwrap() = 0;
    }

    /// Number of connect attempts so far, refused ones included
    pub fn attempts(&self) -> usize {
        self.shared.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.shared.urls.lock().unwrap().clone()
    }

    /// Waits for the next accepted transport
    pub async fn next_session(&self) -> MockSession {
        self.shared
            .sessions_rx
            .lock()
            .await
            .recv()
            .await
            .expect("connector dropped")
    }

    fn should_refuse(&self) -> bool {
        if *self.shared.refuse_all.lock().unwrap() {
            return true;
        }
        let mut remaining = self.shared.refuse_next.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return true;
        }
        false
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Transport>> {
        self.shared.urls.lock().unwrap().push(url.clone());

        if self.should_refuse() {
            return Box::pin(async move {
                Err(RealtimeError::Connection(format!("connection refused: {}", url)))
            });
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Result<Frame>>();

        let sink = sink::unfold(outbound_tx, |tx, text: String| async move {
            tx.send(text)
                .map_err(|_| RealtimeError::Connection("mock peer gone".to_string()))?;
            Ok::<_, RealtimeError>(tx)
        });
        let stream = stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        });

        let _ = self.shared.sessions_tx.send(MockSession {
            url,
            outbound: outbound_rx,
            inbound: Some(inbound_tx),
        });

        Box::pin(async move { Ok(Transport::new(sink, stream)) })
    }
}

/// The server end of one accepted transport.
pub struct MockSession {
    pub url: Url,
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<Result<Frame>>>,
}

impl MockSession {
    pub fn push(&self, text: impl Into<String>) {
        self.push_frame(Ok(Frame::Text(text.into())));
    }

    pub fn push_json(&self, value: Value) {
        self.push(value.to_string());
    }

    pub fn push_frame(&self, frame: Result<Frame>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(frame);
        }
    }

    /// Breaks the transport with a read error
    pub fn fail(&self) {
        self.push_frame(Err(RealtimeError::Connection("connection reset".to_string())));
    }

    /// Sends a close frame and ends the stream
    pub fn close(&mut self, code: u16, reason: &str) {
        self.push_frame(Ok(Frame::Close(Some(CloseInfo {
            code,
            reason: reason.to_string(),
        }))));
        self.inbound = None;
    }

    /// Everything the client has written so far, decoded as JSON
    pub fn drain_sent(&mut self) -> Vec<Value> {
        let mut sent = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            sent.push(serde_json::from_str(&text).expect("client sent invalid JSON"));
        }
        sent
    }

    /// Waits for the next frame written by the client; `None` once the client dropped its sink
    pub async fn next_sent(&mut self) -> Option<Value> {
        let text = self.outbound.recv().await?;
        Some(serde_json::from_str(&text).expect("client sent invalid JSON"))
    }
}
