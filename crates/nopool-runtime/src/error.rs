//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use nopool_adapter_botapi::AdapterError;
use nopool_core::TransportError;

/// Errors that can occur while building or driving the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport could not be built.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Adapter error.
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// A bot-API client was requested without a token.
    #[error("Bot token is not configured (set TELEGRAM_BOT_TOKEN or bot.token)")]
    MissingToken,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
