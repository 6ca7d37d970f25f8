//! Request descriptors.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::proxy::ProxySpec;
use crate::timeouts::TimeoutOverrides;

/// The two verbs the transport supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`, used for file retrieval.
    Get,
    /// `POST`, used for every bot-API call.
    Post,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else {
            Err(TransportError::InvalidRequest(format!(
                "unsupported method: {s}"
            )))
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured value sent as `application/json`.
    Json(Value),
    /// Key/value pairs sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Raw bytes with an optional content type.
    Raw {
        /// Body bytes.
        bytes: Bytes,
        /// `Content-Type` header value.
        content_type: Option<String>,
    },
}

impl RequestBody {
    /// Builds a form body from a JSON object.
    ///
    /// String values are sent as-is; other values are JSON-encoded, which is
    /// how the bot API expects nested objects in form posts. `null` values
    /// are skipped.
    pub fn form_from_map(map: &Map<String, Value>) -> Self {
        let pairs = map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        Self::Form(pairs)
    }
}

/// A fully described outbound request.
///
/// Built once per call and consumed by the transport.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    body: Option<RequestBody>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    proxy: Option<ProxySpec>,
    timeouts: TimeoutOverrides,
}

impl RequestDescriptor {
    /// Creates a request with the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
            proxy: None,
            timeouts: TimeoutOverrides::NONE,
        }
    }

    /// Creates a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Sets a JSON body.
    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Sets a url-encoded form body.
    pub fn form(mut self, pairs: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(pairs));
        self
    }

    /// Sets a raw body.
    pub fn raw(mut self, bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        self.body = Some(RequestBody::Raw {
            bytes: bytes.into(),
            content_type,
        });
        self
    }

    /// Sets any body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Adds a header override.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Routes this request through a proxy.
    pub fn proxy(mut self, proxy: ProxySpec) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Applies per-call timeout overrides.
    pub fn timeouts(mut self, timeouts: TimeoutOverrides) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Target URL with any bot token replaced.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }

    /// Request body, if any.
    pub fn request_body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Header overrides.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Query parameters.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Per-request proxy, if any.
    pub fn proxy_spec(&self) -> Option<&ProxySpec> {
        self.proxy.as_ref()
    }

    /// Per-call timeout overrides.
    pub fn timeout_overrides(&self) -> &TimeoutOverrides {
        &self.timeouts
    }
}

/// Replaces a `/bot<token>/` path segment with `/bot<redacted>/`.
///
/// Only segments that look like bot tokens (containing `:`) are touched.
pub fn redact_url(url: &str) -> String {
    let mut search_from = 0;
    while let Some(pos) = url[search_from..].find("/bot") {
        let start = search_from + pos + "/bot".len();
        let rest = &url[start..];
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let segment = &rest[..end];
        if !segment.is_empty() && segment.contains(':') {
            return format!("{}<redacted>{}", &url[..start], &rest[end..]);
        }
        search_from = start;
    }
    url.to_string()
}
