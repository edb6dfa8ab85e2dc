use thiserror::Error;

/// Errors that can occur when building or driving a realtime connection.
///
/// Runtime operations on [`RealtimeConnection`](crate::RealtimeConnection) never return
/// these; they are logged and surfaced as lifecycle events instead.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Handshake or frame failure on the WebSocket transport
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Transport failed to open or dropped
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid configuration (empty branch, unusable endpoint, zero attempts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A message could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error from the server-push transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `ws_url` is not a valid URL
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The transport cannot perform the operation (e.g. sending over a push-only stream)
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// No transport is open
    #[error("Not connected")]
    NotConnected,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RealtimeError>;
