/// Lifecycle event strings emitted locally by the connection
pub mod lifecycle_events {
    pub const CONNECTED: &str = "connected";
    pub const DISCONNECTED: &str = "disconnected";
    pub const FAILED: &str = "failed";
    pub const ERROR: &str = "error";
}

/// Control message types exchanged with the socket router
pub mod control_events {
    pub const SUBSCRIBE: &str = "subscribe";
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    pub const SUBSCRIBED: &str = "subscribed";
    pub const UNSUBSCRIBED: &str = "unsubscribed";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// Domain event strings published by the backend (magic strings layer)
pub mod domain_events {
    pub const NEW_ORDER: &str = "new_order";
    pub const ORDER_UPDATE: &str = "order_update";
    pub const ITEM_UPDATE: &str = "item_update";
    pub const CONFIG_UPDATE: &str = "config_update";
    pub const BOOKING_CREATED: &str = "booking:created";
    pub const BOOKING_UPDATED: &str = "booking:updated";
    pub const TABLE_STATUS: &str = "table:status";
    pub const NOTIFICATION: &str = "notification";
    pub const ORDER_STATUS_CHANGED: &str = "order_status_changed";
    pub const MENU_UPDATED: &str = "menu_updated";
    pub const SESSION_PAID: &str = "session_paid";
}

/// Well-known channel names
pub mod channels {
    pub const BOOKINGS: &str = "bookings";
    pub const TABLES: &str = "tables";
    pub const ORDERS: &str = "orders";
}

/// Default branch code
pub const DEFAULT_BRANCH: &str = "hirama";

/// Default base address of the socket router
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Default reconnect base interval (milliseconds)
pub const DEFAULT_RECONNECT_INTERVAL: u64 = 3000;

/// Default reconnect delay ceiling (milliseconds)
pub const DEFAULT_MAX_RECONNECT_DELAY: u64 = 30_000;

/// Default max consecutive failed attempts before giving up
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 20;

/// WebSocket close codes
pub const WS_CLOSE_NORMAL: u16 = 1000;
pub const WS_CLOSE_ABNORMAL: u16 = 1006;
