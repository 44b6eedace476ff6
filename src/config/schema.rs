//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the control
//! plane. All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};

use crate::control::service::DEFAULT_SINK_CAPACITY;
use crate::control::Route;

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Listener configuration (bind address, subscription limit).
    pub listener: ListenerConfig,

    /// Push stream tuning.
    pub streaming: StreamingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    /// Seed route table. Empty means the single default route.
    pub routes: Vec<Route>,
}

impl ControlConfig {
    /// Routes the store starts with.
    pub fn initial_routes(&self) -> Vec<Route> {
        if self.routes.is_empty() {
            vec![Route::default_route()]
        } else {
            self.routes.clone()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,

    /// Maximum concurrently open subscribe streams.
    pub max_subscriptions: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
            max_subscriptions: 10_000,
        }
    }
}

/// Per-connection push settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Depth of each subscriber's outbound queue.
    pub sink_capacity: usize,

    /// Upper bound for writing one snapshot frame, in milliseconds.
    pub send_timeout_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            sink_capacity: DEFAULT_SINK_CAPACITY,
            send_timeout_ms: 5000,
        }
    }
}

/// Timeout configuration for unary requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines (production) instead of pretty output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required on `/admin/*`. `None` leaves the API open.
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControlConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9090");
        assert_eq!(config.streaming.sink_capacity, DEFAULT_SINK_CAPACITY);
        assert!(config.admin.api_key.is_none());
        assert_eq!(config.initial_routes(), vec![Route::default_route()]);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: ControlConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:7000"

            [[routes]]
            path = "/api"
            backend = "localhost:4000"
            authRequired = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:7000");
        assert_eq!(config.listener.max_subscriptions, 10_000);
        assert_eq!(config.initial_routes().len(), 1);
        assert!(config.routes[0].auth_required);
        assert_eq!(config.routes[0].timeout_ms, 5000);
    }
}
