use crate::client::ConnectionManager;
use crate::types::ClientMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(25_000);

/// Application-level keepalive: `ping` every interval, expect a `pong` before the next one.
///
/// On timeout the shared `shutdown` token is cancelled; the read task of the same
/// transport treats that as an abnormal close and the reconnect path takes over.
pub struct HeartbeatManager {
    interval: Duration,
    pending_pong: Arc<AtomicBool>,
    connection: Weak<ConnectionManager>,
    shutdown: CancellationToken,
}

impl HeartbeatManager {
    pub fn new(
        connection: Weak<ConnectionManager>,
        pending_pong: Arc<AtomicBool>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            pending_pong,
            connection,
            shutdown,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until the transport shuts down, the connection is dropped, or a pong is missed
    pub async fn run(self) {
        let ping = match ClientMessage::ping().encode() {
            Ok(ping) => ping,
            Err(e) => {
                tracing::error!("[Heartbeat] Failed to serialize ping: {}", e);
                return;
            }
        };

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Connection dropped, exit heartbeat task
            let Some(connection) = self.connection.upgrade() else {
                break;
            };

            if self.pending_pong.load(Ordering::SeqCst) {
                tracing::warn!("[Heartbeat] Timeout detected, closing connection");
                self.shutdown.cancel();
                break;
            }

            // Armed before sending so a fast pong cannot be missed.
            self.pending_pong.store(true, Ordering::SeqCst);
            match connection.send_text(ping.clone()).await {
                Ok(()) => tracing::debug!("Sent heartbeat ping"),
                Err(e) => {
                    self.pending_pong.store(false, Ordering::SeqCst);
                    tracing::error!("[Heartbeat] Failed to send: {}", e);
                }
            }
        }
        tracing::debug!("Heartbeat task finished");
    }
}
