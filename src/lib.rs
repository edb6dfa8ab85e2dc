//! # Yakiniku Realtime
//!
//! Realtime connection manager shared by the restaurant front-ends (dashboard,
//! kitchen display, table-order). It keeps one WebSocket (or SSE) transport open per
//! branch, replays channel subscriptions after every reconnect, retries dropped
//! transports with a linear backoff and fans inbound messages out to listeners.
//!
//! ## Example
//!
//! ```no_run
//! use yakiniku_realtime::{Event, RealtimeConfig, RealtimeConnection, RealtimeEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = RealtimeConnection::new(RealtimeConfig::dashboard(
//!         "ws://localhost:8000/ws",
//!         "hirama",
//!     ))?;
//!
//!     conn.on(RealtimeEvent::BookingCreated, |event: &Event| {
//!         println!("booking: {}", event.data);
//!     });
//!     conn.on(RealtimeEvent::Failed, |_: &Event| {
//!         eprintln!("realtime updates offline");
//!     });
//!
//!     conn.subscribe("bookings").await;
//!     conn.connect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod infrastructure;
pub mod messaging;
pub mod transport;
pub mod types;

pub use client::{ConnectionState, RealtimeConnection, RealtimeConnectionBuilder};
pub use config::{AppNamespace, RealtimeConfig};
pub use infrastructure::ReconnectPolicy;
pub use messaging::{Event, ListenerHandle, ListenerId, ListenerKey, RealtimeEvent};
pub use transport::{Connector, Frame, Transport, TransportKind};
pub use types::{ClientMessage, RealtimeError, Result, ServerMessage};
