use super::connection::ConnectionState;
use crate::infrastructure::{Backoff, ReconnectPolicy, TaskManager};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Consolidated mutable state for RealtimeConnection
/// Using a single struct keeps every transition behind one lock
pub struct ClientState {
    pub connection_state: ConnectionState,

    /// Branch the next transport binds to
    pub branch_code: String,

    /// Channels to (re)subscribe, in insertion order
    pub subscriptions: Vec<String>,

    pub backoff: Backoff,

    /// Identifies the current transport attempt; bumped on every connect/disconnect
    pub generation: u64,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Read and heartbeat tasks of the current transport
    pub task_manager: TaskManager,

    /// Pending backoff timer, if a reconnect is scheduled
    pub reconnect_timer: Option<JoinHandle<()>>,

    state_change_tx: watch::Sender<ConnectionState>,
}

impl ClientState {
    pub fn new(
        branch_code: String,
        policy: ReconnectPolicy,
        state_change_tx: watch::Sender<ConnectionState>,
    ) -> Self {
        Self {
            connection_state: ConnectionState::Disconnected,
            branch_code,
            subscriptions: Vec::new(),
            backoff: Backoff::new(policy),
            generation: 0,
            was_manual_disconnect: false,
            task_manager: TaskManager::new(),
            reconnect_timer: None,
            state_change_tx,
        }
    }

    /// Set connection state and notify watchers
    pub fn set_state(&mut self, new_state: ConnectionState) {
        if self.connection_state != new_state {
            tracing::debug!("Connection state {} -> {}", self.connection_state, new_state);
        }
        self.connection_state = new_state;
        self.state_change_tx.send_replace(new_state);
    }

    /// Starts a new transport attempt, invalidating every older one
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether callbacks from `generation` may still change state
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && !self.was_manual_disconnect
    }

    /// Returns `false` if the channel was already present
    pub fn add_subscription(&mut self, channel: &str) -> bool {
        if self.subscriptions.iter().any(|existing| existing == channel) {
            return false;
        }
        self.subscriptions.push(channel.to_string());
        true
    }

    /// Returns `false` if the channel was not present
    pub fn remove_subscription(&mut self, channel: &str) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|existing| existing != channel);
        self.subscriptions.len() != before
    }

    pub fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
            tracing::debug!("Cancelled pending reconnect");
        }
    }
}

impl Drop for ClientState {
    fn drop(&mut self) {
        self.cancel_reconnect_timer();
    }
}
