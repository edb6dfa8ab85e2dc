// Transport module - Connectors that turn an endpoint URL into a frame sink/stream pair
pub mod sse;
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

pub use sse::SseConnector;
pub use websocket::WebSocketConnector;

use crate::types::{RealtimeError, Result};
use futures::future::BoxFuture;
use futures::{Sink, Stream};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::str::FromStr;
use url::Url;

/// Close code and reason reported by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

/// A frame received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close(Option<CloseInfo>),
}

pub type FrameSink = Pin<Box<dyn Sink<String, Error = RealtimeError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

/// An open transport: outbound text frames in, inbound frames out.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = RealtimeError> + Send + 'static,
        R: Stream<Item = Result<Frame>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// Opens transports. The connection manager only talks to this trait, so tests can
/// swap the network for an in-memory fake.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Transport>>;
}

/// Which connector the builder picks when none is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    WebSocket,
    /// Receive-only Server-Sent Events stream
    Sse,
}

impl FromStr for TransportKind {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(Self::WebSocket),
            "sse" => Ok(Self::Sse),
            other => Err(RealtimeError::Config(format!(
                "unknown transport '{}'",
                other
            ))),
        }
    }
}
