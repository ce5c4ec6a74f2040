use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Main configuration for the relay node.
///
/// Deliberately absent: the arbitration protocol constants (claim
/// window, confirmation window, rotation slice). Those must be identical
/// across every deployed instance and live as compile-time constants in
/// `relay-protocol`; a per-node knob for any of them is a protocol
/// violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Platform HTTP API (outbound calls)
    pub api: ApiConfig,
    /// Event webhook listener (inbound events)
    pub webhook: WebhookConfig,
    /// Link dispatch settings
    pub dispatch: DispatchConfig,
    /// Duplicate-suppression settings
    pub debounce: DebounceConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Outbound platform API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform HTTP API, e.g. "http://127.0.0.1:3000"
    pub base_url: String,
    /// Optional bearer token for the API
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Inbound event webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Listen interface (0.0.0.0 for all interfaces)
    pub bind_address: String,
    /// Listen port
    pub bind_port: u16,
}

/// Link dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Platforms whose routes are active; unknown names are ignored
    pub enabled_platforms: Vec<String>,
    /// Relay links from private chats too (arbitration only ever runs
    /// for group messages; private chats have a single receiving bot)
    pub handle_private_chats: bool,
}

/// Duplicate-suppression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Per-session suppression window in seconds; 0 disables
    pub interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json)
    pub format: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://127.0.0.1:3000".to_string(),
                access_token: None,
                timeout_seconds: 10,
            },
            webhook: WebhookConfig {
                bind_address: "127.0.0.1".to_string(),
                bind_port: 8077,
            },
            dispatch: DispatchConfig {
                enabled_platforms: vec![
                    "bilibili".to_string(),
                    "douyin".to_string(),
                    "twitter".to_string(),
                    "youtube".to_string(),
                    "xiaohongshu".to_string(),
                    "kuaishou".to_string(),
                    "tiktok".to_string(),
                    "weibo".to_string(),
                    "acfun".to_string(),
                    "ncm".to_string(),
                    "telegram".to_string(),
                    "nga".to_string(),
                    "instagram".to_string(),
                ],
                handle_private_chats: true,
            },
            debounce: DebounceConfig {
                interval_seconds: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl RelayConfig {
    /// Load configuration from a file, layered with `RELAY_`-prefixed
    /// environment overrides
    pub fn from_file(path: &str) -> std::result::Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Write the effective configuration back out, e.g. to seed a new
    /// deployment's config file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).map_err(|e| RelayError::Serialization(e.to_string()))?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(RelayError::Config("api.base_url cannot be empty".to_string()));
        }

        if self.api.timeout_seconds == 0 {
            return Err(RelayError::Config(
                "api.timeout_seconds cannot be 0".to_string(),
            ));
        }

        if self.webhook.bind_port == 0 {
            return Err(RelayError::Config(
                "webhook.bind_port cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}
