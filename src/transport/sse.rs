use super::{Connector, Frame, Transport};
use crate::types::{RealtimeError, Result};
use futures::future::BoxFuture;
use futures::{Sink, Stream, StreamExt, sink, stream};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::io::StreamReader;
use url::Url;

/// Opens a Server-Sent Events stream at the endpoint.
///
/// SSE is one-way: every frame written to the transport's sink fails with
/// [`RealtimeError::Unsupported`], so subscribe/unsubscribe/ping report `false`.
#[derive(Debug, Clone, Default)]
pub struct SseConnector {
    client: reqwest::Client,
}

impl SseConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for SseConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<Transport>> {
        let client = self.client.clone();
        Box::pin(async move {
            let url = http_endpoint(url)?;
            tracing::debug!("Opening SSE stream at: {}", url);

            let response = client
                .get(url.clone())
                .header(ACCEPT, "text/event-stream")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(RealtimeError::Connection(format!(
                    "SSE endpoint {} returned {}",
                    url,
                    response.status()
                )));
            }

            let byte_stream = response
                .bytes_stream()
                .map(|result| result.map_err(std::io::Error::other));
            let reader = BufReader::new(StreamReader::new(Box::pin(byte_stream)));

            Ok(Transport::new(receive_only_sink(), parse_events(reader)))
        })
    }
}

fn receive_only_sink() -> impl Sink<String, Error = RealtimeError> + Send + 'static {
    sink::unfold((), |(), _text: String| async move {
        Err::<(), _>(RealtimeError::Unsupported(
            "SSE transport is receive-only".to_string(),
        ))
    })
}

/// Rewrites `ws(s)://` endpoints to their `http(s)://` twin.
pub fn http_endpoint(mut url: Url) -> Result<Url> {
    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => {
            return Err(RealtimeError::Config(format!(
                "unsupported SSE scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RealtimeError::Config(format!("cannot rewrite '{}' to {}", url, scheme)))?;
    Ok(url)
}

struct SseState<R> {
    lines: Lines<R>,
    event: Option<String>,
    data: String,
    finished: bool,
}

impl<R> SseState<R> {
    /// Completes the buffered event, if it carried any data
    fn take_event(&mut self) -> Option<String> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data);
        Some(frame_text(event, data))
    }
}

/// Splits an SSE byte stream into text frames, one per event.
pub fn parse_events<R>(reader: R) -> impl Stream<Item = Result<Frame>> + Send + 'static
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let state = SseState {
        lines: reader.lines(),
        event: None,
        data: String::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            match state.lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        if let Some(text) = state.take_event() {
                            return Some((Ok(Frame::Text(text)), state));
                        }
                        continue;
                    }
                    if let Some(event) = field(&line, "event") {
                        state.event = Some(event.to_string());
                    } else if let Some(data) = field(&line, "data") {
                        if !state.data.is_empty() {
                            state.data.push('\n');
                        }
                        state.data.push_str(data);
                    }
                    // id:, retry: and comments are ignored
                }
                Ok(None) => {
                    state.finished = true;
                    return state
                        .take_event()
                        .map(|text| (Ok(Frame::Text(text)), state));
                }
                Err(e) => {
                    state.finished = true;
                    return Some((
                        Err(RealtimeError::Connection(format!("SSE read error: {}", e))),
                        state,
                    ));
                }
            }
        }
    })
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let value = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}

/// Named SSE events whose JSON body has no `type` get the event name as their type.
fn frame_text(event: Option<String>, data: String) -> String {
    let Some(event) = event else {
        return data;
    };
    match serde_json::from_str::<Value>(&data) {
        Ok(Value::Object(mut object)) if !object.contains_key("type") => {
            object.insert("type".to_string(), Value::String(event));
            Value::Object(object).to_string()
        }
        _ => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn parse(input: &'static [u8]) -> Vec<Frame> {
        parse_events(BufReader::new(input))
            .map(|frame| frame.unwrap())
            .collect()
            .await
    }

    fn json_of(frame: &Frame) -> Value {
        match frame {
            Frame::Text(text) => serde_json::from_str(text).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parses_data_events() {
        let frames = parse(
            b": keepalive\n\
              data: {\"type\":\"new_order\",\"data\":{\"id\":1}}\n\
              \n\
              id: 7\n\
              data:{\"type\":\"order_update\"}\n\
              \n",
        )
        .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(json_of(&frames[0])["data"]["id"], 1);
        assert_eq!(json_of(&frames[1])["type"], "order_update");
    }

    #[tokio::test]
    async fn test_multiline_data_is_joined() {
        let frames = parse(b"data: {\"type\":\ndata: \"pong\"}\n\n").await;
        assert_eq!(frames, vec![Frame::Text("{\"type\":\n\"pong\"}".to_string())]);
        assert_eq!(json_of(&frames[0]), json!({"type": "pong"}));
    }

    #[tokio::test]
    async fn test_named_event_fills_missing_type() {
        let frames = parse(
            b"event: table:status\n\
              data: {\"table_id\":4,\"status\":\"occupied\"}\n\
              \n\
              event: ignored\n\
              data: {\"type\":\"notification\"}\n\
              \n",
        )
        .await;

        assert_eq!(json_of(&frames[0])["type"], "table:status");
        assert_eq!(json_of(&frames[0])["status"], "occupied");
        assert_eq!(json_of(&frames[1])["type"], "notification");
    }

    #[tokio::test]
    async fn test_trailing_event_is_flushed_at_eof() {
        let frames = parse(b"data: {\"type\":\"menu_updated\"}").await;
        assert_eq!(frames.len(), 1);
        assert_eq!(json_of(&frames[0])["type"], "menu_updated");

        assert!(parse(b"\n\n: nothing here\n").await.is_empty());
    }

    #[test]
    fn test_http_endpoint_rewrites_scheme() {
        let url = Url::parse("ws://localhost:8000/ws/kitchen?branch=hirama").unwrap();
        assert_eq!(
            http_endpoint(url).unwrap().as_str(),
            "http://localhost:8000/ws/kitchen?branch=hirama"
        );

        let url = Url::parse("wss://shop.example.com/ws").unwrap();
        assert_eq!(http_endpoint(url).unwrap().scheme(), "https");

        let url = Url::parse("ftp://shop.example.com/ws").unwrap();
        assert!(http_endpoint(url).is_err());
    }

    #[tokio::test]
    async fn test_sink_rejects_writes() {
        use futures::SinkExt;

        let mut sink = Box::pin(receive_only_sink());
        let result = sink.send("{}".to_string()).await;
        assert!(matches!(result, Err(RealtimeError::Unsupported(_))));
    }
}
