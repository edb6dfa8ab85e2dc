//! Connection configuration.
//!
//! The three front-ends differ only in endpoint path, the query parameter that
//! carries the branch, and their reconnect limits. [`AppNamespace`] captures those
//! differences so one [`RealtimeConfig`] shape serves every app.

use crate::infrastructure::ReconnectPolicy;
use crate::transport::TransportKind;
use crate::types::{DEFAULT_BRANCH, DEFAULT_WS_URL, RealtimeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Which front-end the connection belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppNamespace {
    #[default]
    Dashboard,
    Kitchen,
    TableOrder,
    /// Any other path below the base address (empty for the base itself)
    Custom(String),
}

impl AppNamespace {
    pub fn parse(s: &str) -> Self {
        match s {
            "dashboard" => Self::Dashboard,
            "kitchen" => Self::Kitchen,
            "table-order" | "table_order" => Self::TableOrder,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Path appended to the base address
    pub fn path(&self) -> &str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Kitchen => "kitchen",
            Self::TableOrder => "table-order",
            Self::Custom(path) => path,
        }
    }

    /// Query parameter carrying the branch code
    pub fn branch_param(&self) -> &'static str {
        match self {
            Self::TableOrder => "branch_code",
            _ => "branch",
        }
    }

    /// Reconnect limits each front-end shipped with
    pub fn default_policy(&self) -> ReconnectPolicy {
        match self {
            Self::Dashboard => ReconnectPolicy::new(3000, 10),
            Self::Kitchen => ReconnectPolicy::new(3000, 20),
            // fixed 3s retry, three strikes before offline mode
            Self::TableOrder => ReconnectPolicy::new(3000, 3).with_max_delay(Some(3000)),
            Self::Custom(_) => ReconnectPolicy::default(),
        }
    }
}

impl From<String> for AppNamespace {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for AppNamespace {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<AppNamespace> for String {
    fn from(namespace: AppNamespace) -> Self {
        match namespace {
            AppNamespace::Custom(path) => path,
            other => other.path().to_string(),
        }
    }
}

impl std::fmt::Display for AppNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Everything needed to reach the realtime endpoint of one app.
///
/// When deserialized without a `reconnect` table, the namespace's profile applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RealtimeConfigFile")]
pub struct RealtimeConfig {
    /// Base address of the socket router, e.g. `ws://localhost:8000/ws`
    pub ws_url: String,
    /// Branch (tenant) the session is bound to
    pub branch_code: String,
    pub namespace: AppNamespace,
    /// Extra query pairs appended after the branch (e.g. `table_id`)
    pub extra_query: Vec<(String, String)>,
    pub reconnect: ReconnectPolicy,
    /// Keepalive ping interval; `None` disables the heartbeat
    pub heartbeat_interval_ms: Option<u64>,
    pub transport: TransportKind,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::for_app(AppNamespace::default(), DEFAULT_WS_URL, DEFAULT_BRANCH)
    }
}

/// Serialized shape of [`RealtimeConfig`] with every field optional.
#[derive(Deserialize)]
#[serde(default)]
struct RealtimeConfigFile {
    ws_url: String,
    branch_code: String,
    namespace: AppNamespace,
    extra_query: Vec<(String, String)>,
    reconnect: Option<ReconnectPolicy>,
    heartbeat_interval_ms: Option<u64>,
    transport: TransportKind,
}

impl Default for RealtimeConfigFile {
    fn default() -> Self {
        let config = RealtimeConfig::default();
        Self {
            ws_url: config.ws_url,
            branch_code: config.branch_code,
            namespace: config.namespace,
            extra_query: config.extra_query,
            reconnect: None,
            heartbeat_interval_ms: config.heartbeat_interval_ms,
            transport: config.transport,
        }
    }
}

impl From<RealtimeConfigFile> for RealtimeConfig {
    fn from(file: RealtimeConfigFile) -> Self {
        Self {
            reconnect: file
                .reconnect
                .unwrap_or_else(|| file.namespace.default_policy()),
            ws_url: file.ws_url,
            branch_code: file.branch_code,
            namespace: file.namespace,
            extra_query: file.extra_query,
            heartbeat_interval_ms: file.heartbeat_interval_ms,
            transport: file.transport,
        }
    }
}

impl RealtimeConfig {
    /// Config carrying the given app's reconnect profile
    pub fn for_app(
        namespace: AppNamespace,
        ws_url: impl Into<String>,
        branch_code: impl Into<String>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            branch_code: branch_code.into(),
            reconnect: namespace.default_policy(),
            namespace,
            extra_query: Vec::new(),
            heartbeat_interval_ms: None,
            transport: TransportKind::default(),
        }
    }

    pub fn dashboard(ws_url: impl Into<String>, branch_code: impl Into<String>) -> Self {
        Self::for_app(AppNamespace::Dashboard, ws_url, branch_code)
    }

    pub fn kitchen(ws_url: impl Into<String>, branch_code: impl Into<String>) -> Self {
        Self::for_app(AppNamespace::Kitchen, ws_url, branch_code)
    }

    pub fn table_order(
        ws_url: impl Into<String>,
        branch_code: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self::for_app(AppNamespace::TableOrder, ws_url, branch_code).with_query("table_id", table_id)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_query.push((key.into(), value.into()));
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Effective keepalive interval. Always `None` on the receive-only SSE transport.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        if self.transport == TransportKind::Sse {
            return None;
        }
        self.heartbeat_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Builds `{ws_url}/{namespace}?{branch_param}={branch_code}&{extra_query...}`
    pub fn endpoint_url(&self, branch_code: &str) -> Result<Url> {
        let mut url = Url::parse(&self.ws_url)?;

        let path = self.namespace.path();
        if !path.is_empty() {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RealtimeError::Config(format!("endpoint '{}' cannot carry a path", self.ws_url))
            })?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair(self.namespace.branch_param(), branch_code);
            for (key, value) in &self.extra_query {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.ws_url)?;
        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(RealtimeError::Config(format!(
                "unsupported endpoint scheme '{}'",
                url.scheme()
            )));
        }
        if self.transport == TransportKind::WebSocket && !matches!(url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::Config(format!(
                "WebSocket transport needs a ws:// or wss:// endpoint, got '{}'",
                self.ws_url
            )));
        }
        if self.branch_code.trim().is_empty() {
            return Err(RealtimeError::Config("branch code is required".to_string()));
        }
        if self.reconnect.max_attempts == 0 {
            return Err(RealtimeError::Config(
                "reconnect.max_attempts must be at least 1".to_string(),
            ));
        }
        self.endpoint_url(&self.branch_code).map(|_| ())
    }

    /// Loads the config from `REALTIME_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the config from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let namespace = lookup("REALTIME_APP")
            .map(AppNamespace::from)
            .unwrap_or_default();
        let ws_url = lookup("REALTIME_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string());
        let branch_code = lookup("REALTIME_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string());

        let mut config = Self::for_app(namespace, ws_url, branch_code);

        if let Some(table_id) = lookup("REALTIME_TABLE_ID") {
            config = config.with_query("table_id", table_id);
        }
        if let Some(base) = parse_var::<u64>(&lookup, "REALTIME_RECONNECT_INTERVAL_MS")? {
            config.reconnect.base_delay_ms = base;
        }
        if let Some(max) = parse_var::<u32>(&lookup, "REALTIME_MAX_RECONNECT_ATTEMPTS")? {
            config.reconnect.max_attempts = max;
        }
        // 0 removes the cap
        if let Some(cap) = parse_var::<u64>(&lookup, "REALTIME_MAX_RECONNECT_DELAY_MS")? {
            config.reconnect.max_delay_ms = (cap > 0).then_some(cap);
        }
        if let Some(heartbeat) = parse_var::<u64>(&lookup, "REALTIME_HEARTBEAT_MS")? {
            config.heartbeat_interval_ms = Some(heartbeat);
        }
        if let Some(transport) = lookup("REALTIME_TRANSPORT") {
            config.transport = transport.parse()?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RealtimeError::Config(format!("{}='{}': {}", key, raw, e))),
        None => Ok(None),
    }
}
