//! Adapter error types.

use nopool_core::TransportError;
use thiserror::Error;

/// Errors surfaced to the bot-API client.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The transport failed (timeout, status, connection).
    #[error("HTTP request failed: {0}")]
    Request(#[from] TransportError),

    /// The adapter was shut down before the call.
    #[error("request adapter has been shut down")]
    Closed,

    /// Only POST is accepted by `do_request`.
    #[error("Only POST method is supported, got {0}")]
    UnsupportedMethod(String),

    /// A response did not have the expected shape.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bot API answered with `ok: false`.
    #[error("Bot API error {code}: {description}")]
    Api {
        /// `error_code` from the envelope (0 if absent).
        code: i64,
        /// `description` from the envelope.
        description: String,
        /// Seconds to wait before retrying, for flood-control errors.
        retry_after: Option<u64>,
    },

    /// Local file I/O during a download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdapterError {
    /// Returns `true` if repeating the call can never succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Closed | Self::UnsupportedMethod(_) | Self::Request(TransportError::Closed)
        )
    }

    /// Returns `true` if the underlying transport timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
