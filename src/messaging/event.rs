use crate::types::constants::{control_events, domain_events, lifecycle_events};
use serde::{Deserialize, Serialize};

/// Type-safe event kinds.
///
/// Inbound `type` strings that are not known here are kept verbatim in
/// [`RealtimeEvent::Custom`], so listeners can subscribe to any literal type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RealtimeEvent {
    /// Transport opened (also sent by the server as a greeting)
    Connected,
    /// Transport closed or explicitly disconnected
    Disconnected,
    /// Reconnect attempts exhausted
    Failed,
    /// Transport-level error
    Error,

    /// Subscription acknowledged by the server
    Subscribed,
    /// Unsubscription acknowledged by the server
    Unsubscribed,
    /// Reply to a keepalive ping
    Pong,

    NewOrder,
    OrderUpdate,
    ItemUpdate,
    ConfigUpdate,
    BookingCreated,
    BookingUpdated,
    TableStatus,
    Notification,
    OrderStatusChanged,
    MenuUpdated,
    SessionPaid,

    /// Custom user-defined event
    Custom(String),
}

impl RealtimeEvent {
    /// Parse a string into a RealtimeEvent
    pub fn parse(s: &str) -> Self {
        match s {
            lifecycle_events::CONNECTED => Self::Connected,
            lifecycle_events::DISCONNECTED => Self::Disconnected,
            lifecycle_events::FAILED => Self::Failed,
            lifecycle_events::ERROR => Self::Error,
            control_events::SUBSCRIBED => Self::Subscribed,
            control_events::UNSUBSCRIBED => Self::Unsubscribed,
            control_events::PONG => Self::Pong,
            domain_events::NEW_ORDER => Self::NewOrder,
            domain_events::ORDER_UPDATE => Self::OrderUpdate,
            domain_events::ITEM_UPDATE => Self::ItemUpdate,
            domain_events::CONFIG_UPDATE => Self::ConfigUpdate,
            domain_events::BOOKING_CREATED => Self::BookingCreated,
            domain_events::BOOKING_UPDATED => Self::BookingUpdated,
            domain_events::TABLE_STATUS => Self::TableStatus,
            domain_events::NOTIFICATION => Self::Notification,
            domain_events::ORDER_STATUS_CHANGED => Self::OrderStatusChanged,
            domain_events::MENU_UPDATED => Self::MenuUpdated,
            domain_events::SESSION_PAID => Self::SessionPaid,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Convert event to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => lifecycle_events::CONNECTED,
            Self::Disconnected => lifecycle_events::DISCONNECTED,
            Self::Failed => lifecycle_events::FAILED,
            Self::Error => lifecycle_events::ERROR,
            Self::Subscribed => control_events::SUBSCRIBED,
            Self::Unsubscribed => control_events::UNSUBSCRIBED,
            Self::Pong => control_events::PONG,
            Self::NewOrder => domain_events::NEW_ORDER,
            Self::OrderUpdate => domain_events::ORDER_UPDATE,
            Self::ItemUpdate => domain_events::ITEM_UPDATE,
            Self::ConfigUpdate => domain_events::CONFIG_UPDATE,
            Self::BookingCreated => domain_events::BOOKING_CREATED,
            Self::BookingUpdated => domain_events::BOOKING_UPDATED,
            Self::TableStatus => domain_events::TABLE_STATUS,
            Self::Notification => domain_events::NOTIFICATION,
            Self::OrderStatusChanged => domain_events::ORDER_STATUS_CHANGED,
            Self::MenuUpdated => domain_events::MENU_UPDATED,
            Self::SessionPaid => domain_events::SESSION_PAID,
            Self::Custom(s) => s,
        }
    }

    /// Events produced by the connection itself rather than the server
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Disconnected | Self::Failed | Self::Error
        )
    }
}

impl From<&str> for RealtimeEvent {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for RealtimeEvent {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RealtimeEvent> for String {
    fn from(event: RealtimeEvent) -> Self {
        match event {
            RealtimeEvent::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_event_parse() {
        assert_eq!(RealtimeEvent::parse("connected"), RealtimeEvent::Connected);
        assert_eq!(
            RealtimeEvent::parse("booking:created"),
            RealtimeEvent::BookingCreated
        );
        assert_eq!(
            RealtimeEvent::parse("table:status"),
            RealtimeEvent::TableStatus
        );
        assert_eq!(RealtimeEvent::parse("pong"), RealtimeEvent::Pong);
        assert_eq!(
            RealtimeEvent::parse("kitchen:bump"),
            RealtimeEvent::Custom("kitchen:bump".to_string())
        );
    }

    #[test]
    fn test_known_events_keep_their_wire_name() {
        let events = vec![
            RealtimeEvent::Connected,
            RealtimeEvent::Disconnected,
            RealtimeEvent::Failed,
            RealtimeEvent::Error,
            RealtimeEvent::Subscribed,
            RealtimeEvent::Unsubscribed,
            RealtimeEvent::Pong,
            RealtimeEvent::NewOrder,
            RealtimeEvent::OrderUpdate,
            RealtimeEvent::ItemUpdate,
            RealtimeEvent::ConfigUpdate,
            RealtimeEvent::BookingCreated,
            RealtimeEvent::BookingUpdated,
            RealtimeEvent::TableStatus,
            RealtimeEvent::Notification,
            RealtimeEvent::OrderStatusChanged,
            RealtimeEvent::MenuUpdated,
            RealtimeEvent::SessionPaid,
        ];

        for event in events {
            assert_eq!(RealtimeEvent::parse(event.as_str()), event);
            assert!(!matches!(event, RealtimeEvent::Custom(_)));
        }
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_value(RealtimeEvent::OrderUpdate).unwrap();
        assert_eq!(json, serde_json::json!("order_update"));

        let custom: RealtimeEvent = serde_json::from_str(r#""staff_call""#).unwrap();
        assert_eq!(custom, RealtimeEvent::Custom("staff_call".to_string()));
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(RealtimeEvent::Failed.is_lifecycle());
        assert!(!RealtimeEvent::Pong.is_lifecycle());
        assert!(!RealtimeEvent::Custom("connected_tables".into()).is_lifecycle());
    }
}
