//! Proxy specification parsing.
//!
//! A proxy is given as a single URL string of the form
//! `scheme://[user:pass@]host:port`. Parsing goes through the WHATWG URL
//! parser so IPv6 hosts and passwords containing `@` or `:` are handled;
//! credentials are percent-decoded.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{TransportError, TransportResult};

/// Basic-auth credentials for a proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    /// Proxy user name.
    pub username: String,
    /// Proxy password (empty when the URL carried only a user name).
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A parsed proxy: scheme, host, port and optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    scheme: String,
    host: String,
    port: Option<u16>,
    credentials: Option<ProxyCredentials>,
}

impl ProxySpec {
    /// Parses a proxy URL string.
    ///
    /// Input without a `scheme://` prefix is treated as `http://`. When the
    /// URL carries credentials the proxy is rebuilt as `http://host:port`,
    /// whatever scheme was given.
    pub fn parse(raw: &str) -> TransportResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(trimmed, "empty proxy URL"));
        }

        let normalized: Cow<'_, str> = if trimmed.contains("://") {
            Cow::Borrowed(trimmed)
        } else {
            Cow::Owned(format!("http://{trimmed}"))
        };

        let url = Url::parse(&normalized).map_err(|e| invalid(trimmed, e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid(trimmed, "missing host"))?;

        let credentials = if url.username().is_empty() && url.password().is_none() {
            None
        } else {
            Some(ProxyCredentials {
                username: decode(url.username()),
                password: url.password().map(decode).unwrap_or_default(),
            })
        };

        // A credentialed proxy is always spoken to over plain HTTP.
        let (scheme, port) = if credentials.is_some() {
            ("http", Some(url.port().unwrap_or(80)))
        } else {
            (url.scheme(), url.port_or_known_default())
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            credentials,
        })
    }

    /// Proxy URL without credentials, e.g. `http://proxy.local:3128`.
    pub fn url(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    /// URL scheme (`http`, `https`, ...).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or bracketed IPv6 literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme's default port.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Basic-auth credentials, if the URL carried any.
    pub fn credentials(&self) -> Option<&ProxyCredentials> {
        self.credentials.as_ref()
    }
}

impl FromStr for ProxySpec {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProxySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn decode(part: &str) -> String {
    percent_decode_str(part).decode_utf8_lossy().into_owned()
}

fn invalid(raw: &str, reason: impl Into<String>) -> TransportError {
    TransportError::InvalidProxy {
        proxy: strip_userinfo(raw).to_string(),
        reason: reason.into(),
    }
}

/// Drops everything up to the last `@` so credentials never reach logs.
fn strip_userinfo(raw: &str) -> &str {
    match raw.rfind('@') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    }
}
