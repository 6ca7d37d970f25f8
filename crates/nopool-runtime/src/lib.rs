//! nopool Runtime - configuration, logging and wiring.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, [`NoPoolConfig`])
//! - Logging configuration ([`LoggingBuilder`])
//! - A runtime that builds the transport and adapter from configuration
//!   ([`NoPoolRuntime`])
//!
//! ```ignore
//! use nopool_runtime::NoPoolRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = NoPoolRuntime::load()?;
//!     let bot = runtime.bot_api()?;
//!     bot.get_me().await?;
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, NoPoolConfig,
    TransportConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{NoPoolRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
