//! Transport error types.
//!
//! Adapter-level errors wrap these and live in the adapter crate.

use thiserror::Error;

/// Boxed error used to keep the underlying cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while executing a single request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A connect, read or total timeout elapsed.
    #[error("request timeout: {url}")]
    Timeout {
        /// The (redacted) target URL.
        url: String,
    },

    /// The server answered with a status of 400 or above.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The (redacted) target URL.
        url: String,
        /// Numeric HTTP status.
        status: u16,
        /// Response body text, or a placeholder if it could not be read.
        body: String,
    },

    /// DNS, refused connection, TLS or protocol failure.
    #[error("request failed: {url} - {source}")]
    Connection {
        /// The (redacted) target URL.
        url: String,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The proxy URL could not be parsed.
    #[error("invalid proxy URL '{proxy}': {reason}")]
    InvalidProxy {
        /// The proxy string with credentials removed.
        proxy: String,
        /// Reason for failure.
        reason: String,
    },

    /// The transport was closed before the request was issued.
    #[error("transport has been closed")]
    Closed,

    /// Local I/O failure while streaming a response to its destination.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a connection error from any underlying cause.
    pub fn connection(
        url: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Connection {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for timeout errors.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
