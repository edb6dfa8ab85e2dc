use crate::types::{
    DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_MAX_RECONNECT_DELAY, DEFAULT_RECONNECT_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect settings: `delay = min(base_delay_ms * attempt, max_delay_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub base_delay_ms: u64,
    /// `None` lets the delay grow without bound
    pub max_delay_ms: Option<u64>,
    /// Consecutive failed cycles tolerated before giving up
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base_delay_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_delay_ms,
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: Option<u64>) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let linear = self.base_delay_ms.saturating_mul(u64::from(attempt));
        let millis = match self.max_delay_ms {
            Some(cap) => linear.min(cap),
            None => linear,
        };
        Duration::from_millis(millis)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: DEFAULT_RECONNECT_INTERVAL,
            max_delay_ms: Some(DEFAULT_MAX_RECONNECT_DELAY),
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// What to do after a failed or closed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

/// Attempt counter for reconnection with linear backoff
#[derive(Debug, Clone)]
pub struct Backoff {
    attempts: u32,
    policy: ReconnectPolicy,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            attempts: 0,
            policy,
        }
    }

    /// Records a failed cycle and decides whether another attempt is allowed
    pub fn record_failure(&mut self) -> RetryDecision {
        self.attempts = self.attempts.saturating_add(1);
        if self.attempts >= self.policy.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.policy.delay_for(self.attempts))
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Reset the counter
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
