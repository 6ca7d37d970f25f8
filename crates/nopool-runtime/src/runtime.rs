//! Wires configuration, logging, transport and adapter together.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nopool_runtime::NoPoolRuntime;
//!
//! // Loads nopool.toml + environment, initializes logging.
//! let runtime = NoPoolRuntime::load()?;
//! runtime.initialize().await?;
//!
//! let bot = runtime.bot_api()?;
//! println!("{}", bot.get_me().await?);
//!
//! runtime.shutdown().await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use nopool_adapter_botapi::{BaseRequest, BotApi, NoPoolRequest};
use nopool_core::BoxedTransport;
use nopool_transport::{NoPoolTransport, TransportStats};

use crate::config::{ConfigLoader, NoPoolConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Runtime owning one transport and the adapter built on it.
pub struct NoPoolRuntime {
    config: NoPoolConfig,
    transport: Arc<NoPoolTransport>,
    request: Arc<NoPoolRequest>,
}

impl NoPoolRuntime {
    /// Creates a runtime from an already-loaded configuration.
    ///
    /// Does not touch logging.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the transport
    /// cannot be built.
    pub fn new(config: NoPoolConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;

        let transport = Arc::new(NoPoolTransport::new(config.transport.to_core_config()?)?);
        let request = Arc::new(NoPoolRequest::new(
            Arc::clone(&transport) as BoxedTransport
        ));

        info!(
            strategy = %config.transport.strategy,
            proxy = config.transport.proxy_url.is_some(),
            api_base = %config.bot.api_base,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config,
            transport,
            request,
        })
    }

    /// Loads configuration from the default locations, initializes logging
    /// and builds the runtime.
    pub fn load() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &NoPoolConfig {
        &self.config
    }

    /// The request adapter, for handing to a bot-API client.
    pub fn request(&self) -> Arc<NoPoolRequest> {
        Arc::clone(&self.request)
    }

    /// Request counters of the underlying transport.
    pub fn stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// Builds a bot-API client from the configured token and endpoint.
    ///
    /// # Errors
    /// Returns [`RuntimeError::MissingToken`] if no token is configured.
    pub fn bot_api(&self) -> RuntimeResult<BotApi> {
        let token = self
            .config
            .bot
            .token
            .clone()
            .ok_or(RuntimeError::MissingToken)?;
        let request: Arc<dyn BaseRequest> = self.request();
        Ok(BotApi::new(token, request).with_api_base(&self.config.bot.api_base))
    }

    /// Moves the adapter to its active state.
    pub async fn initialize(&self) -> RuntimeResult<()> {
        self.request.initialize().await?;
        Ok(())
    }

    /// Shuts the adapter (and with it the transport) down. Idempotent.
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        self.request.shutdown().await?;
        info!(stats = ?self.stats(), "Runtime shut down");
        Ok(())
    }
}

/// Builder for [`NoPoolRuntime`].
pub struct RuntimeBuilder {
    loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            init_logging: true,
        }
    }

    /// Loads this file instead of searching.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Selects the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    /// Gives full control over configuration loading.
    pub fn loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Leaves the global subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<NoPoolRuntime> {
        let config = self.loader.load()?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        NoPoolRuntime::new(config)
    }
}
