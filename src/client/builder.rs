use super::core::Shared;
use super::{ClientState, ConnectionManager, ConnectionState, RealtimeConnection};
use crate::config::RealtimeConfig;
use crate::messaging::ListenerRegistry;
use crate::transport::{Connector, SseConnector, TransportKind, WebSocketConnector};
use crate::types::Result;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

/// Builder for RealtimeConnection that validates the config and picks a transport
pub struct RealtimeConnectionBuilder {
    config: RealtimeConfig,
    connector: Option<Arc<dyn Connector>>,
}

impl RealtimeConnectionBuilder {
    /// Create a new builder
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Config`](crate::RealtimeError::Config) or
    /// [`RealtimeError::UrlParse`](crate::RealtimeError::UrlParse) when the config is unusable.
    pub fn new(config: RealtimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connector: None,
        })
    }

    /// Overrides the transport picked from `config.transport`
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Build the connection. Nothing is opened until `connect()`.
    pub fn build(self) -> RealtimeConnection {
        let connector = self.connector.unwrap_or_else(|| match self.config.transport {
            TransportKind::WebSocket => Arc::new(WebSocketConnector::new()) as Arc<dyn Connector>,
            TransportKind::Sse => Arc::new(SseConnector::new()),
        });

        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let client_state = ClientState::new(
            self.config.branch_code.clone(),
            self.config.reconnect,
            state_tx,
        );

        RealtimeConnection {
            shared: Arc::new(Shared {
                config: self.config,
                connector,
                connection: Arc::new(ConnectionManager::new()),
                listeners: Arc::new(ListenerRegistry::new()),
                state: RwLock::new(client_state),
                state_rx,
            }),
        }
    }
}
