//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nopool_adapter_botapi::DEFAULT_API_BASE;
use nopool_core::{PoolStrategy, ProxySpec, TimeoutBudget};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoPoolConfig {
    /// Bot credentials and endpoint.
    #[serde(default)]
    pub bot: BotConfig,

    /// Transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials and endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot token (`TELEGRAM_BOT_TOKEN`).
    #[serde(default)]
    pub token: Option<String>,

    /// User allowed to talk to the bot (`ALLOWED_TELEGRAM_USER_ID`).
    #[serde(default)]
    pub allowed_user_id: Option<i64>,

    /// Bot-API endpoint.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            allowed_user_id: None,
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("allowed_user_id", &self.allowed_user_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

// =============================================================================
// Transport
// =============================================================================

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Total request timeout in milliseconds.
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,

    /// Proxy URL, `scheme://[user:pass@]host:port`.
    #[serde(default)]
    pub proxy_url: Option<String>,

    /// `fresh-client` or `shared-no-idle`.
    #[serde(default)]
    pub strategy: PoolStrategy,

    /// Maximum concurrent requests.
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub danger_accept_invalid_certs: bool,

    /// Let the HTTP client read proxy variables itself.
    #[serde(default)]
    pub trust_env: bool,

    /// `User-Agent` override.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            total_timeout_ms: default_total_timeout_ms(),
            proxy_url: None,
            strategy: PoolStrategy::default(),
            max_in_flight: None,
            danger_accept_invalid_certs: false,
            trust_env: false,
            user_agent: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    15000
}

fn default_read_timeout_ms() -> u64 {
    30000
}

fn default_total_timeout_ms() -> u64 {
    30000
}

impl TransportConfig {
    /// Timeout budget described by this section.
    pub fn timeouts(&self) -> TimeoutBudget {
        TimeoutBudget::new(
            Duration::from_millis(self.connect_timeout_ms),
            Duration::from_millis(self.read_timeout_ms),
            Duration::from_millis(self.total_timeout_ms),
        )
    }

    /// Parses the proxy URL, if any.
    pub fn proxy(&self) -> ConfigResult<Option<ProxySpec>> {
        self.proxy_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                ProxySpec::parse(url).map_err(|e| ConfigError::InvalidProxy {
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Converts runtime config to core config.
    pub fn to_core_config(&self) -> ConfigResult<nopool_core::TransportConfig> {
        let mut config = nopool_core::TransportConfig::new()
            .with_timeouts(self.timeouts())
            .with_strategy(self.strategy)
            .with_trust_env(self.trust_env)
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs);

        if let Some(proxy) = self.proxy()? {
            config = config.with_proxy(proxy);
        }
        if let Some(max) = self.max_in_flight {
            config = config.with_max_in_flight(max);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent.clone());
        }
        Ok(config)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, abbreviated.
    #[default]
    Compact,
    /// Single-line with span context.
    Full,
    /// Multi-line, human oriented.
    Pretty,
    /// Newline-delimited JSON (needs the `json-log` feature).
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Written to `file_path`.
    File,
}

/// Rotation policy for file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level: trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file names and line numbers.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `nopool_transport = "debug"`.
    #[serde(default = "default_filters")]
    pub filters: BTreeMap<String, String>,

    #[serde(default)]
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            thread_ids: false,
            file_location: false,
            filters: default_filters(),
            span_events: SpanEventConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_filters() -> BTreeMap<String, String> {
    ["hyper", "hyper_util", "reqwest"]
        .into_iter()
        .map(|module| (module.to_string(), "warn".to_string()))
        .collect()
}
