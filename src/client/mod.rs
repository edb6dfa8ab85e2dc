// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::RealtimeConnectionBuilder;
pub use connection::{ConnectionManager, ConnectionState};
pub use self::core::RealtimeConnection;
pub use state::ClientState;
