use serde::{Deserialize, Serialize, de};
use serde_json::{Map, Value};

use crate::RealtimeEvent;
use crate::types::constants::control_events;
use crate::types::error::Result;

/// Inbound envelope pushed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub event: RealtimeEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ServerMessage {
    pub fn new(event: impl Into<RealtimeEvent>, data: Value) -> Self {
        Self {
            event: event.into(),
            channel: None,
            data: Some(data),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Decodes a text frame.
    ///
    /// Some endpoints put their fields at the top level instead of under `data`;
    /// in that case the whole object becomes the payload.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        if !raw.is_object() {
            let e = <serde_json::Error as de::Error>::custom("envelope must be a JSON object");
            return Err(e.into());
        }
        let mut message: ServerMessage = serde_json::from_value(raw.clone())?;
        if message.data.is_none() {
            message.data = Some(raw);
        }
        Ok(message)
    }

    pub fn payload(&self) -> &Value {
        self.data.as_ref().unwrap_or(&Value::Null)
    }
}

/// Outbound control or command message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ClientMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            channel: None,
            fields: Map::new(),
        }
    }

    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self::new(control_events::SUBSCRIBE).with_channel(channel)
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self::new(control_events::UNSUBSCRIBE).with_channel(channel)
    }

    pub fn ping() -> Self {
        Self::new(control_events::PING)
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_with_data_and_channel() {
        let message = ServerMessage::decode(
            r#"{"type":"booking:created","channel":"bookings","data":{"id":7}}"#,
        )
        .unwrap();

        assert_eq!(message.event, RealtimeEvent::BookingCreated);
        assert_eq!(message.channel.as_deref(), Some("bookings"));
        assert_eq!(message.payload(), &json!({"id": 7}));
    }

    #[test]
    fn test_decode_without_data_uses_whole_message() {
        let message = ServerMessage::decode(
            r#"{"type":"order_status_changed","new_status":"ready","order_number":12}"#,
        )
        .unwrap();

        assert_eq!(message.event, RealtimeEvent::OrderStatusChanged);
        assert_eq!(message.channel, None);
        assert_eq!(message.payload()["new_status"], "ready");
        assert_eq!(message.payload()["order_number"], 12);
    }

    #[test]
    fn test_decode_null_data_uses_whole_message() {
        let message = ServerMessage::decode(r#"{"type":"pong","data":null}"#).unwrap();
        assert_eq!(message.event, RealtimeEvent::Pong);
        assert_eq!(message.payload()["type"], "pong");
    }

    #[test]
    fn test_decode_unknown_type_is_custom() {
        let message = ServerMessage::decode(r#"{"type":"staff_call","data":{}}"#).unwrap();
        assert_eq!(
            message.event,
            RealtimeEvent::Custom("staff_call".to_string())
        );
    }

    #[test]
    fn test_decode_rejects_malformed_frames() {
        assert!(ServerMessage::decode("not json").is_err());
        assert!(ServerMessage::decode(r#"{"data":{}}"#).is_err());
        assert!(ServerMessage::decode(r#"{"type":42}"#).is_err());
        assert!(ServerMessage::decode(r#"["type","pong"]"#).is_err());
    }

    #[test]
    fn test_subscribe_message_serialization() {
        let json = serde_json::to_value(ClientMessage::subscribe("orders")).unwrap();
        assert_eq!(json, json!({"type": "subscribe", "channel": "orders"}));

        let json = serde_json::to_value(ClientMessage::unsubscribe("tables")).unwrap();
        assert_eq!(json, json!({"type": "unsubscribe", "channel": "tables"}));
    }

    #[test]
    fn test_ping_and_command_serialization() {
        let ping = ClientMessage::ping().encode().unwrap();
        assert_eq!(ping, r#"{"type":"ping"}"#);
        assert!(!ping.contains("channel"));

        let command = ClientMessage::new("call_staff")
            .with_field("table_id", json!("T-4"))
            .with_field("reason", json!("water"));
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(
            json,
            json!({"type": "call_staff", "table_id": "T-4", "reason": "water"})
        );
    }
}
