use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection and publication tuning for the contexts manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextsConfig {
    #[serde(alias = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
    #[serde(alias = "backoff-initial-value-ms")]
    pub backoff_initial_value_ms: u64,
    #[serde(alias = "backoff-multiplier")]
    pub backoff_multiplier: f64,
    #[serde(alias = "backoff-limit-ms")]
    pub backoff_limit_ms: u64,
    #[serde(alias = "backoff-multiplier-current-context")]
    pub backoff_multiplier_current_context: f64,
    #[serde(alias = "backoff-limit-current-context-ms")]
    pub backoff_limit_current_context_ms: u64,
    #[serde(alias = "backoff-jitter-ms")]
    pub backoff_jitter_ms: u64,
    #[serde(alias = "dispatch-timeout-ms")]
    pub dispatch_timeout_ms: u64,
}

impl Default for ContextsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            backoff_initial_value_ms: 1000,
            backoff_multiplier: 2.0,
            backoff_limit_ms: 60_000,
            backoff_multiplier_current_context: 1.2,
            backoff_limit_current_context_ms: 10_000,
            backoff_jitter_ms: 300,
            dispatch_timeout_ms: 100,
        }
    }
}

impl ContextsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn backoff_initial_value(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_value_ms)
    }

    pub fn backoff_limit(&self) -> Duration {
        Duration::from_millis(self.backoff_limit_ms)
    }

    pub fn backoff_limit_current_context(&self) -> Duration {
        Duration::from_millis(self.backoff_limit_current_context_ms)
    }

    pub fn backoff_jitter(&self) -> Duration {
        Duration::from_millis(self.backoff_jitter_ms)
    }
}
