use crate::transport::FrameSink;
use crate::types::{RealtimeError, Result};
use futures::SinkExt;
use tokio::sync::Mutex;

/// Lifecycle of a [`RealtimeConnection`](super::RealtimeConnection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Reconnect attempts exhausted; only an explicit `connect()` leaves this state
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owns the write half of the current transport.
pub struct ConnectionManager {
    writer: Mutex<Option<FrameSink>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(None),
        }
    }

    /// Sets the write sink (called after a transport opened)
    pub async fn set_writer(&self, writer: FrameSink) {
        *self.writer.lock().await = Some(writer);
    }

    /// Detaches the write sink so the caller can close it
    pub async fn take_writer(&self) -> Option<FrameSink> {
        self.writer.lock().await.take()
    }

    /// Sends one text frame through the current transport
    pub async fn send_text(&self, text: String) -> Result<()> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(sink) => sink.send(text).await,
            None => Err(RealtimeError::NotConnected),
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::channel::mpsc;

    fn channel_sink() -> (FrameSink, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded::<String>();
        let sink = tx.sink_map_err(|e| RealtimeError::Connection(e.to_string()));
        (Box::pin(sink), rx)
    }

    #[tokio::test]
    async fn test_send_without_writer_fails() {
        let connection = ConnectionManager::new();
        assert!(matches!(
            connection.send_text("{}".to_string()).await,
            Err(RealtimeError::NotConnected)
        ));
        assert!(connection.take_writer().await.is_none());
    }

    #[tokio::test]
    async fn test_send_then_take_writer() {
        let connection = ConnectionManager::new();
        let (sink, mut rx) = channel_sink();
        connection.set_writer(sink).await;

        connection.send_text(r#"{"type":"ping"}"#.to_string()).await.unwrap();
        assert_eq!(rx.next().await.as_deref(), Some(r#"{"type":"ping"}"#));

        let mut writer = connection.take_writer().await.unwrap();
        writer.close().await.unwrap();
        assert!(matches!(
            connection.send_text("{}".to_string()).await,
            Err(RealtimeError::NotConnected)
        ));
        assert_eq!(rx.next().await, None);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Failed.to_string(), "failed");
    }
}
