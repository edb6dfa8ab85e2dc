use super::{ClientState, ConnectionManager, ConnectionState, RealtimeConnectionBuilder};
use crate::config::RealtimeConfig;
use crate::infrastructure::{HeartbeatManager, RetryDecision};
use crate::messaging::{
    Event, ListenerHandle, ListenerId, ListenerKey, ListenerRegistry, MessageRouter, RealtimeEvent,
};
use crate::transport::{CloseInfo, Connector, Frame, FrameStream, Transport};
use crate::types::{ClientMessage, RealtimeError, Result, WS_CLOSE_ABNORMAL, WS_CLOSE_NORMAL};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;

pub(crate) struct Shared {
    pub(crate) config: RealtimeConfig,
    pub(crate) connector: Arc<dyn Connector>,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    pub(crate) listeners: Arc<ListenerRegistry>,

    // Consolidated mutable state
    pub(crate) state: RwLock<ClientState>,

    pub(crate) state_rx: watch::Receiver<ConnectionState>,
}

/// How a transport ended, as reported by its read task.
struct Closed {
    close: Option<CloseInfo>,
    error: Option<RealtimeError>,
}

/// A realtime connection to one app endpoint of the backend.
///
/// `RealtimeConnection` keeps a transport open for the configured branch, replays the
/// subscription set every time the transport (re)opens, and fans inbound messages out
/// to listeners registered with [`on()`](Self::on). Dropped transports are reopened
/// after a linear backoff until the configured attempt limit is reached.
///
/// The handle is cheap to clone; all clones drive the same connection. Runtime
/// failures never surface as errors: they arrive as `error`, `disconnected` and
/// `failed` events.
///
/// # Example
///
/// ```no_run
/// use yakiniku_realtime::{Event, RealtimeConfig, RealtimeConnection};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = RealtimeConnection::new(RealtimeConfig::kitchen("ws://localhost:8000/ws", "hirama"))?;
///
/// conn.on("new_order", |event: &Event| {
///     println!("new order: {}", event.data);
/// });
/// conn.subscribe("orders").await;
/// conn.connect().await;
/// // ...
/// conn.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeConnection {
    pub(crate) shared: Arc<Shared>,
}

impl RealtimeConnection {
    /// Creates a connection for `config`, using the transport named in `config.transport`.
    ///
    /// This does not open anything. Call [`connect()`](Self::connect) to start.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Config`] or [`RealtimeError::UrlParse`] when the config
    /// cannot produce a valid endpoint.
    pub fn new(config: RealtimeConfig) -> Result<Self> {
        RealtimeConnectionBuilder::new(config).map(RealtimeConnectionBuilder::build)
    }

    /// Starts a builder, e.g. to plug in a custom [`Connector`].
    pub fn builder(config: RealtimeConfig) -> Result<RealtimeConnectionBuilder> {
        RealtimeConnectionBuilder::new(config)
    }

    /// Opens a transport to the current branch's endpoint.
    ///
    /// Any existing transport is closed first and a pending reconnect is cancelled.
    /// After an explicit [`disconnect()`](Self::disconnect) or once the connection has
    /// [`Failed`](ConnectionState::Failed), the attempt counter starts over.
    ///
    /// Returns once the attempt has opened or failed. Failures are reported through
    /// `error`/`disconnected` events and retried in the background.
    pub async fn connect(&self) {
        let generation = {
            let mut state = self.shared.state.write().await;
            state.cancel_reconnect_timer();
            if state.was_manual_disconnect || state.connection_state == ConnectionState::Failed {
                state.backoff.reset();
            }
            state.was_manual_disconnect = false;
            state.next_generation()
        };
        self.open_transport(generation).await;
    }

    /// Switches to `branch_code` and connects to it.
    pub async fn connect_to_branch(&self, branch_code: impl Into<String>) {
        self.shared.state.write().await.branch_code = branch_code.into();
        self.connect().await;
    }

    /// Closes the transport and stops reconnecting until the next [`connect()`](Self::connect).
    ///
    /// Emits `disconnected` with `"manual": true` when a transport was open.
    pub async fn disconnect(&self) {
        let writer = {
            let mut state = self.shared.state.write().await;
            state.cancel_reconnect_timer();
            state.task_manager.abort_all();
            state.was_manual_disconnect = true;
            state.next_generation();
            state.set_state(ConnectionState::Disconnected);
            self.shared.connection.take_writer().await
        };

        let Some(mut writer) = writer else {
            tracing::debug!("Disconnect requested with no open transport");
            return;
        };
        if let Err(e) = writer.close().await {
            tracing::debug!("Error while closing transport: {}", e);
        }

        tracing::info!("Disconnected from realtime server");
        self.emit(
            RealtimeEvent::Disconnected,
            json!({"code": WS_CLOSE_NORMAL, "reason": null, "manual": true}),
        );
    }

    /// Serializes and sends `message` if connected.
    ///
    /// Returns `false` (and logs) when not connected or when the transport rejects the
    /// frame. Nothing is queued.
    pub async fn send(&self, message: &ClientMessage) -> bool {
        if self.state() != ConnectionState::Connected {
            tracing::debug!("Not connected, dropping '{}' message", message.kind);
            return false;
        }

        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize '{}' message: {}", message.kind, e);
                return false;
            }
        };

        match self.shared.connection.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send '{}' message: {}", message.kind, e);
                false
            }
        }
    }

    /// Sends `{"type":"ping"}`; the server answers with `pong`.
    pub async fn ping(&self) -> bool {
        self.send(&ClientMessage::ping()).await
    }

    /// Adds `channel` to the subscription set and, if connected, subscribes right away.
    ///
    /// Returns whether a subscribe message went out now. Either way the channel is
    /// replayed on every future (re)connect.
    pub async fn subscribe(&self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        let connected = {
            let mut state = self.shared.state.write().await;
            state.add_subscription(&channel);
            state.connection_state == ConnectionState::Connected
        };
        connected && self.send(&ClientMessage::subscribe(channel)).await
    }

    /// Removes `channel` from the subscription set and, if connected, unsubscribes right away.
    pub async fn unsubscribe(&self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        let connected = {
            let mut state = self.shared.state.write().await;
            state.remove_subscription(&channel);
            state.connection_state == ConnectionState::Connected
        };
        connected && self.send(&ClientMessage::unsubscribe(channel)).await
    }

    /// Registers `handler` for every message (or lifecycle event) of kind `key`.
    ///
    /// Handlers run synchronously on the connection's read task in registration order.
    /// A panicking handler is logged and skipped. Handlers must not block on this
    /// connection's async methods; spawn a task instead.
    pub fn on<F>(&self, key: impl Into<ListenerKey>, handler: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared.listeners.register(key, handler)
    }

    /// Registers `handler` only for messages of kind `event` tagged with `channel`.
    pub fn on_channel<F>(
        &self,
        channel: impl Into<String>,
        event: impl Into<RealtimeEvent>,
        handler: F,
    ) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared
            .listeners
            .register(ListenerKey::channel(channel, event), handler)
    }

    /// Removes one handler. Returns `false` if it was not registered.
    pub fn off(&self, key: impl Into<ListenerKey>, id: ListenerId) -> bool {
        self.shared.listeners.remove(&key.into(), id)
    }

    /// Changes the branch this connection is bound to.
    ///
    /// A live or opening transport is dropped (`disconnected` with
    /// `"reason": "branch_changed"`) and a new one is opened for the new branch. While
    /// disconnected the branch is only recorded for the next attempt.
    pub async fn set_branch(&self, branch_code: impl Into<String>) {
        let branch_code = branch_code.into();
        let live = {
            let mut state = self.shared.state.write().await;
            if state.branch_code == branch_code {
                return;
            }
            tracing::info!("Switching branch {} -> {}", state.branch_code, branch_code);
            state.branch_code = branch_code.clone();
            matches!(
                state.connection_state,
                ConnectionState::Connected | ConnectionState::Connecting
            )
        };

        if live {
            self.emit(
                RealtimeEvent::Disconnected,
                json!({"reason": "branch_changed", "branch": branch_code}),
            );
            self.connect().await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_rx.borrow()
    }

    /// Watch receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub async fn branch_code(&self) -> String {
        self.shared.state.read().await.branch_code.clone()
    }

    /// Current subscription set, in replay order
    pub async fn subscriptions(&self) -> Vec<String> {
        self.shared.state.read().await.subscriptions.clone()
    }

    /// Failed cycles since the last successful open
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.state.read().await.backoff.attempts()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.shared.config
    }

    fn from_weak(shared: &Weak<Shared>) -> Option<Self> {
        shared.upgrade().map(|shared| Self { shared })
    }

    /// Closes whatever transport is open and starts attempt `generation`
    async fn open_transport(&self, generation: u64) {
        let (url, previous) = {
            let mut state = self.shared.state.write().await;
            if !state.is_current(generation) {
                return;
            }
            state.task_manager.abort_all();
            let previous = self.shared.connection.take_writer().await;
            state.set_state(ConnectionState::Connecting);
            (self.shared.config.endpoint_url(&state.branch_code), previous)
        };

        if let Some(mut writer) = previous {
            tracing::debug!("Closing previous transport");
            let _ = writer.close().await;
        }

        let url = match url {
            Ok(url) => url,
            Err(e) => {
                self.handle_transport_closed(generation, Closed { close: None, error: Some(e) })
                    .await;
                return;
            }
        };

        tracing::info!("Connecting to {}", url);
        match self.shared.connector.connect(url).await {
            Ok(transport) => self.on_transport_open(generation, transport).await,
            Err(e) => {
                tracing::error!("Connection attempt failed: {}", e);
                self.handle_transport_closed(generation, Closed { close: None, error: Some(e) })
                    .await;
            }
        }
    }

    async fn on_transport_open(&self, generation: u64, transport: Transport) {
        let Transport { sink, stream } = transport;

        let mut state = self.shared.state.write().await;
        if !state.is_current(generation) {
            drop(state);
            tracing::debug!("Discarding superseded transport (generation {})", generation);
            let mut sink = sink;
            let _ = sink.close().await;
            return;
        }

        self.shared.connection.set_writer(sink).await;
        state.backoff.reset();
        state.set_state(ConnectionState::Connected);

        // Replay under the lock so a concurrent subscribe() is sent exactly once.
        for channel in &state.subscriptions {
            let replay = ClientMessage::subscribe(channel.as_str()).encode();
            match replay {
                Ok(text) => {
                    if let Err(e) = self.shared.connection.send_text(text).await {
                        tracing::warn!("Failed to resubscribe to {}: {}", channel, e);
                    }
                }
                Err(e) => tracing::error!("Failed to serialize subscribe: {}", e),
            }
        }
        if !state.subscriptions.is_empty() {
            tracing::debug!("Replayed {} subscription(s)", state.subscriptions.len());
        }

        // Still under the lock: a racing disconnect() can only emit after `connected`.
        tracing::info!("Connected to realtime server (branch {})", state.branch_code);
        self.emit(RealtimeEvent::Connected, json!({"branch": state.branch_code}));
        self.spawn_transport_tasks(&mut state, generation, stream);
    }

    /// Spawns the read task and, when configured, the heartbeat for this transport
    fn spawn_transport_tasks(&self, state: &mut ClientState, generation: u64, stream: FrameStream) {
        let shutdown = CancellationToken::new();
        let pending_pong = Arc::new(AtomicBool::new(false));
        let router = MessageRouter::new(Arc::clone(&self.shared.listeners), Arc::clone(&pending_pong));

        state.task_manager.spawn(
            "read",
            read_loop(
                Arc::downgrade(&self.shared),
                generation,
                stream,
                router,
                shutdown.clone(),
            ),
        );

        if let Some(interval) = self.shared.config.heartbeat_interval() {
            let heartbeat =
                HeartbeatManager::new(Arc::downgrade(&self.shared.connection), pending_pong, shutdown)
                    .with_interval(interval);
            state.task_manager.spawn("heartbeat", heartbeat.run());
        }
    }

    /// A transport of `generation` failed to open or dropped: count it and retry or give up
    async fn handle_transport_closed(&self, generation: u64, closed: Closed) {
        let (decision, attempts) = {
            let mut state = self.shared.state.write().await;
            if !state.is_current(generation) {
                tracing::debug!("Ignoring close of stale transport (generation {})", generation);
                return;
            }

            drop(self.shared.connection.take_writer().await);
            let decision = state.backoff.record_failure();
            state.set_state(ConnectionState::Disconnected);
            (decision, state.backoff.attempts())
        };

        if let Some(error) = &closed.error {
            self.emit(RealtimeEvent::Error, json!({"message": error.to_string()}));
        }
        let (code, reason) = match &closed.close {
            Some(info) => (info.code, Value::String(info.reason.clone())),
            None => (WS_CLOSE_ABNORMAL, Value::Null),
        };
        self.emit(
            RealtimeEvent::Disconnected,
            json!({"code": code, "reason": reason, "manual": false}),
        );

        match decision {
            RetryDecision::RetryAfter(delay) => {
                tracing::info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    attempts,
                    self.shared.config.reconnect.max_attempts
                );
                let mut state = self.shared.state.write().await;
                if state.is_current(generation) {
                    self.schedule_reconnect(&mut state, generation, delay);
                }
            }
            RetryDecision::GiveUp => {
                {
                    let mut state = self.shared.state.write().await;
                    if !state.is_current(generation) {
                        return;
                    }
                    state.set_state(ConnectionState::Failed);
                }
                tracing::error!("Giving up after {} failed attempt(s)", attempts);
                self.emit(RealtimeEvent::Failed, json!({"attempts": attempts}));
            }
        }
    }

    fn schedule_reconnect(&self, state: &mut ClientState, generation: u64, delay: Duration) {
        state.cancel_reconnect_timer();
        let shared = Arc::downgrade(&self.shared);
        state.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(connection) = Self::from_weak(&shared) {
                connection.reconnect_after_backoff(generation).await;
            }
        }));
    }

    /// Runs on the timer task once the backoff delay elapsed
    async fn reconnect_after_backoff(&self, generation: u64) {
        let next = {
            let mut state = self.shared.state.write().await;
            // Detach first so a later cancel cannot abort this task mid-connect.
            state.reconnect_timer = None;
            if !state.is_current(generation) {
                return;
            }
            tracing::info!("Attempting to reconnect...");
            state.next_generation()
        };
        self.open_transport(next).await;
    }

    fn emit(&self, kind: RealtimeEvent, data: Value) {
        self.shared.listeners.dispatch(&Event::new(kind, data));
    }
}

async fn read_loop(
    shared: Weak<Shared>,
    generation: u64,
    mut stream: FrameStream,
    router: MessageRouter,
    shutdown: CancellationToken,
) {
    tracing::info!("Starting read task");
    let closed = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break Closed {
                    close: Some(CloseInfo {
                        code: WS_CLOSE_ABNORMAL,
                        reason: "heartbeat timeout".to_string(),
                    }),
                    error: None,
                };
            }
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    tracing::debug!("Received text message: {}", text);
                    router.route(&text);
                }
                Some(Ok(Frame::Close(close))) => {
                    match &close {
                        Some(info) => tracing::warn!(
                            "Server closed connection: code={}, reason='{}'",
                            info.code,
                            info.reason
                        ),
                        None => tracing::warn!("Server closed connection without close frame"),
                    }
                    break Closed { close, error: None };
                }
                Some(Err(e)) => {
                    tracing::error!("Transport read error: {}", e);
                    break Closed { close: None, error: Some(e) };
                }
                None => {
                    tracing::warn!("Transport stream ended");
                    break Closed { close: None, error: None };
                }
            }
        }
    };

    // Stops the heartbeat of this transport.
    shutdown.cancel();
    drop(stream);

    if let Some(connection) = RealtimeConnection::from_weak(&shared) {
        connection.handle_transport_closed(generation, closed).await;
    }
    tracing::info!("Read task finished");
}
