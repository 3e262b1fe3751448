//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for assistant-relay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Remote assistant service configuration
    #[serde(default)]
    pub assistant: AssistantConfig,
    /// Run polling configuration
    #[serde(default)]
    pub polling: PollingConfig,
    /// Session handling configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Hosted assistant service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the assistants API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Identifier of the remote assistant that processes runs
    #[serde(default)]
    pub assistant_id: String,
    /// Per-request timeout for remote calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Extra headers added to every remote call
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
    /// Vector stores attached when file search is enabled on the assistant
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            assistant_id: String::new(),
            request_timeout_secs: default_request_timeout(),
            extra_headers: HashMap::new(),
            vector_store_ids: Vec::new(),
        }
    }
}

impl AssistantConfig {
    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Sleep between run status checks, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    /// Maximum number of status checks before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Page size used when fetching the reply
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_max_attempts() -> u32 {
    120 // ~60s at the default interval
}

fn default_history_limit() -> u32 {
    50
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            history_limit: default_history_limit(),
        }
    }
}

/// Session handling configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Reject chat requests that do not carry a session id
    #[serde(default)]
    pub require_session: bool,
    /// Extra run instructions sent on follow-up turns only
    #[serde(default)]
    pub follow_up_instructions: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
