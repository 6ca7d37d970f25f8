//! Configuration types for the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportResult;
use crate::proxy::ProxySpec;
use crate::timeouts::TimeoutBudget;

// =============================================================================
// Pool Strategy
// =============================================================================

/// How the transport guarantees one connection per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolStrategy {
    /// Build a new client (and connector) for every request and drop it
    /// afterwards.
    #[default]
    FreshClient,
    /// Keep one client whose idle pool is zero; every request still closes
    /// its socket.
    SharedNoIdle,
}

impl PoolStrategy {
    /// Configuration name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreshClient => "fresh-client",
            Self::SharedNoIdle => "shared-no-idle",
        }
    }
}

impl fmt::Display for PoolStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transport Config
// =============================================================================

/// Configuration for a no-pool transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Timeout budget applied to every request.
    pub timeouts: TimeoutBudget,
    /// Proxy used when a request does not carry its own.
    pub proxy: Option<ProxySpec>,
    /// Pooling strategy.
    pub strategy: PoolStrategy,
    /// Maximum number of concurrent requests (None = unbounded).
    pub max_in_flight: Option<usize>,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Honor system proxy variables when no proxy is configured.
    pub trust_env: bool,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutBudget::default(),
            proxy: None,
            strategy: PoolStrategy::default(),
            max_in_flight: None,
            accept_invalid_certs: false,
            trust_env: false,
            user_agent: concat!("nopool/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout budget.
    pub fn with_timeouts(mut self, timeouts: TimeoutBudget) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the proxy.
    pub fn with_proxy(mut self, proxy: ProxySpec) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Parses and sets the proxy from a URL string.
    pub fn with_proxy_url(mut self, proxy_url: &str) -> TransportResult<Self> {
        self.proxy = Some(ProxySpec::parse(proxy_url)?);
        Ok(self)
    }

    /// Sets the pooling strategy.
    pub fn with_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Caps the number of concurrent requests.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Disables TLS certificate verification.
    ///
    /// Only for environments with an intercepting proxy whose certificate
    /// cannot be installed.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Honors `HTTP_PROXY`/`HTTPS_PROXY` when no proxy is configured.
    pub fn with_trust_env(mut self, trust: bool) -> Self {
        self.trust_env = trust;
        self
    }

    /// Sets the `User-Agent`.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
