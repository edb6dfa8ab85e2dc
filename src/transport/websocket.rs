use super::{CloseInfo, Connector, Frame, Transport};
use crate::types::{RealtimeError, Result};
use futures::future::{self, BoxFuture};
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use url::Url;

/// Opens WebSocket transports with tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Transport>> {
        Box::pin(async move {
            tracing::debug!("Creating WebSocket connection to: {}", url);
            let (ws_stream, response) = connect_async(url.as_str()).await?;
            tracing::debug!("WebSocket handshake completed: {}", response.status());

            let (write_half, read_half) = ws_stream.split();

            let sink = write_half
                .sink_map_err(RealtimeError::from)
                .with(|text: String| future::ready(Ok::<_, RealtimeError>(Message::Text(text.into()))));
            let stream = read_half.filter_map(|result| future::ready(translate(result)));

            Ok(Transport::new(sink, stream))
        })
    }
}

/// Maps a raw WebSocket message onto a [`Frame`]. Control and binary frames are dropped.
fn translate(result: std::result::Result<Message, WsError>) -> Option<Result<Frame>> {
    match result {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
        Ok(Message::Close(frame)) => Some(Ok(Frame::Close(frame.map(|close| CloseInfo {
            code: u16::from(close.code),
            reason: close.reason.as_str().to_owned(),
        })))),
        Ok(Message::Ping(data)) => {
            tracing::debug!("Received ping ({} bytes)", data.len());
            None
        }
        Ok(Message::Pong(data)) => {
            tracing::debug!("Received pong ({} bytes)", data.len());
            None
        }
        Ok(Message::Binary(data)) => {
            tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
            None
        }
        Ok(Message::Frame(_)) => {
            tracing::debug!("Received raw frame (internal)");
            None
        }
        Err(e) => Some(Err(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_translate_text_and_close() {
        assert_eq!(
            translate(Ok(Message::Text(r#"{"type":"pong"}"#.into()))).unwrap().unwrap(),
            Frame::Text(r#"{"type":"pong"}"#.to_string())
        );

        let close = Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "server restart".into(),
        }));
        assert_eq!(
            translate(Ok(close)).unwrap().unwrap(),
            Frame::Close(Some(CloseInfo {
                code: 1001,
                reason: "server restart".to_string(),
            }))
        );

        assert_eq!(
            translate(Ok(Message::Close(None))).unwrap().unwrap(),
            Frame::Close(None)
        );
    }

    #[test]
    fn test_translate_skips_control_frames() {
        assert!(translate(Ok(Message::Ping(vec![1u8].into()))).is_none());
        assert!(translate(Ok(Message::Pong(Vec::<u8>::new().into()))).is_none());
        assert!(translate(Ok(Message::Binary(vec![0u8, 1].into()))).is_none());
    }

    #[test]
    fn test_translate_error() {
        let result = translate(Err(WsError::ConnectionClosed)).unwrap();
        assert!(matches!(result, Err(RealtimeError::WebSocket(_))));
    }
}
