use super::{Event, ListenerRegistry, RealtimeEvent};
use crate::types::message::ServerMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

impl From<ServerMessage> for Event {
    fn from(message: ServerMessage) -> Self {
        Self {
            kind: message.event,
            channel: message.channel,
            data: message.data.unwrap_or_default(),
        }
    }
}

/// Routes incoming frames to registered listeners
pub struct MessageRouter {
    listeners: Arc<ListenerRegistry>,
    pending_pong: Arc<AtomicBool>,
}

impl MessageRouter {
    pub fn new(listeners: Arc<ListenerRegistry>, pending_pong: Arc<AtomicBool>) -> Self {
        Self {
            listeners,
            pending_pong,
        }
    }

    /// Decodes a text frame and dispatches it.
    ///
    /// Malformed frames are logged and dropped. Returns whether the frame was dispatched.
    pub fn route(&self, text: &str) -> bool {
        let message = match ServerMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Failed to parse message: {} - Raw: {}", e, text);
                return false;
            }
        };

        if message.event == RealtimeEvent::Pong {
            self.handle_pong();
        }

        tracing::debug!(
            "Routing message: type={}, channel={}",
            message.event,
            message.channel.as_deref().unwrap_or("-")
        );

        self.listeners.dispatch(&Event::from(message));
        true
    }

    /// Clears the outstanding keepalive so the heartbeat does not time out
    fn handle_pong(&self) {
        if self.pending_pong.swap(false, Ordering::SeqCst) {
            tracing::debug!("Received heartbeat pong");
        }
    }
}
