//! Configuration structures.
//!
//! Configuration is loaded from environment variables; the binary layers CLI
//! flags on top via clap.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{Error, Result};

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote platform API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Subscription manager configuration.
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,

    /// MCP transport configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("GUEPARD_API_URL") {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = get("ACCESS_TOKEN") {
            config.api.access_token = Some(token);
        }
        if let Some(raw) = get("GUEPARD_GATEWAY_TIMEOUT") {
            config.subscriptions.gateway_timeout = parse_duration(&raw)?;
        }
        if let Some(path) = get("GUEPARD_SUBSCRIPTION_STATE") {
            config.subscriptions.state_path = Some(PathBuf::from(path));
        }
        if let Some(format) = get("GUEPARD_LOG_FORMAT") {
            config.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        if let Some(level) = get("RUST_LOG") {
            config.observability.log_level = level;
        }

        Ok(config)
    }
}

/// Parse a human-readable duration such as `5s` or `1500ms`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw.trim())
        .map_err(|e| Error::configuration(format!("invalid duration '{}': {}", raw, e)))
}

/// Remote platform API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform REST API.
    pub base_url: String,

    /// Bearer token for the platform API.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Per-request timeout for platform API calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.guepard.run".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Subscription manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Deadline for every notification gateway and status provider call.
    #[serde(with = "humantime_serde")]
    pub gateway_timeout: Duration,

    /// Where to persist subscription state. `None` keeps state in memory only.
    pub state_path: Option<PathBuf>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(5),
            state_path: None,
        }
    }
}

/// MCP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Maximum accepted size of a single JSON-RPC message line.
    pub max_message_bytes: usize,

    /// Bounded channel capacity between request tasks and the stdout writer.
    pub response_channel_capacity: usize,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 5 * 1024 * 1024,
            response_channel_capacity: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api.base_url, "https://api.guepard.run");
        assert_eq!(config.subscriptions.gateway_timeout, Duration::from_secs(5));
        assert!(config.subscriptions.state_path.is_none());
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("GUEPARD_API_URL", "http://localhost:8080/"),
            ("ACCESS_TOKEN", "tok"),
            ("GUEPARD_GATEWAY_TIMEOUT", "1500ms"),
            ("GUEPARD_SUBSCRIPTION_STATE", "/tmp/subs.json"),
            ("GUEPARD_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.access_token.as_deref(), Some("tok"));
        assert_eq!(
            config.subscriptions.gateway_timeout,
            Duration::from_millis(1500)
        );
        assert_eq!(
            config.subscriptions.state_path,
            Some(PathBuf::from("/tmp/subs.json"))
        );
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_invalid_timeout_is_configuration_error() {
        let err = Config::from_lookup(lookup(&[("GUEPARD_GATEWAY_TIMEOUT", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_serde_humantime_round_trip() {
        let json = serde_json::json!({
            "subscriptions": { "gateway_timeout": "2s", "state_path": null }
        });
        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.subscriptions.gateway_timeout, Duration::from_secs(2));
    }
}
