// Messaging module - Event kinds, listener registry and message routing
pub mod event;
pub mod listeners;
pub mod router;

pub use event::RealtimeEvent;
pub use listeners::{Event, Handler, ListenerHandle, ListenerId, ListenerKey, ListenerRegistry};
pub use router::MessageRouter;
