use super::RealtimeEvent;
use crate::types::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Listener callback. Runs synchronously on the connection's read task and must not block.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

type Bindings = HashMap<ListenerKey, Vec<(ListenerId, Handler)>>;

/// A decoded event as seen by listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: RealtimeEvent,
    pub channel: Option<String>,
    pub data: Value,
}

impl Event {
    pub fn new(kind: impl Into<RealtimeEvent>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            channel: None,
            data,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Deserializes the payload into a caller-defined shape.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Key under which listeners are registered.
///
/// `Event` keys receive every message of that kind; `Channel` keys only receive
/// messages that arrived tagged with that channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenerKey {
    Event(RealtimeEvent),
    Channel {
        channel: String,
        event: RealtimeEvent,
    },
}

impl ListenerKey {
    pub fn channel(channel: impl Into<String>, event: impl Into<RealtimeEvent>) -> Self {
        Self::Channel {
            channel: channel.into(),
            event: event.into(),
        }
    }
}

impl From<RealtimeEvent> for ListenerKey {
    fn from(event: RealtimeEvent) -> Self {
        Self::Event(event)
    }
}

impl From<&str> for ListenerKey {
    fn from(s: &str) -> Self {
        Self::Event(RealtimeEvent::parse(s))
    }
}

impl From<String> for ListenerKey {
    fn from(s: String) -> Self {
        Self::Event(RealtimeEvent::parse(&s))
    }
}

impl std::fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(event) => write!(f, "{}", event),
            Self::Channel { channel, event } => write!(f, "{}:{}", channel, event),
        }
    }
}

/// Identifies one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Returned by `on()`. Dropping it keeps the listener registered; call
/// [`dispose`](Self::dispose) to remove it.
#[derive(Debug)]
pub struct ListenerHandle {
    id: ListenerId,
    key: ListenerKey,
    bindings: Weak<Mutex<Bindings>>,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn key(&self) -> &ListenerKey {
        &self.key
    }

    /// Removes exactly this listener. Returns `false` if it was already removed.
    pub fn dispose(self) -> bool {
        match self.bindings.upgrade() {
            Some(bindings) => remove_binding(&bindings, &self.key, self.id),
            None => false,
        }
    }
}

/// Ordered handler lists keyed by [`ListenerKey`].
pub struct ListenerRegistry {
    bindings: Arc<Mutex<Bindings>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn register<F>(&self, key: impl Into<ListenerKey>, handler: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let key = key.into();
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        lock(&self.bindings)
            .entry(key.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::debug!("Registered listener {:?} for {}", id, key);

        ListenerHandle {
            id,
            key,
            bindings: Arc::downgrade(&self.bindings),
        }
    }

    pub fn remove(&self, key: &ListenerKey, id: ListenerId) -> bool {
        remove_binding(&self.bindings, key, id)
    }

    pub fn listener_count(&self, key: &ListenerKey) -> usize {
        lock(&self.bindings).get(key).map_or(0, Vec::len)
    }

    /// Invokes every handler registered under `key`, in registration order.
    ///
    /// A panicking handler is logged and skipped. Returns how many handlers completed.
    pub fn emit(&self, key: &ListenerKey, event: &Event) -> usize {
        // Snapshot so handlers can register or dispose listeners while running.
        let handlers: Vec<(ListenerId, Handler)> = match lock(&self.bindings).get(key) {
            Some(handlers) => handlers.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    tracing::error!(
                        "Listener {:?} for {} panicked: {}",
                        id,
                        key,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        completed
    }

    /// Emits under the event's kind, then under `(channel, kind)` when the event has a channel.
    pub fn dispatch(&self, event: &Event) -> usize {
        let mut completed = self.emit(&ListenerKey::Event(event.kind.clone()), event);
        if let Some(channel) = &event.channel {
            completed += self.emit(&ListenerKey::channel(channel.clone(), event.kind.clone()), event);
        }
        completed
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(bindings: &Mutex<Bindings>) -> MutexGuard<'_, Bindings> {
    bindings.lock().unwrap_or_else(PoisonError::into_inner)
}

fn remove_binding(bindings: &Mutex<Bindings>, key: &ListenerKey, id: ListenerId) -> bool {
    let mut bindings = lock(bindings);
    let Some(handlers) = bindings.get_mut(key) else {
        return false;
    };

    let before = handlers.len();
    handlers.retain(|(existing, _)| *existing != id);
    let removed = handlers.len() != before;

    if handlers.is_empty() {
        bindings.remove(key);
    }
    removed
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
