//! No-pool HTTP client transport.
//!
//! Every request runs inside its own [`ConnectionScope`]. With
//! [`PoolStrategy::FreshClient`] the scope owns a client built for that
//! request alone; with [`PoolStrategy::SharedNoIdle`] it holds a clone of a
//! client whose idle pool is zero. Either way requests go out as HTTP/1.1
//! with `Connection: close`, so no socket outlives its exchange.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{CONNECTION, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, Response};
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use nopool_core::{
    HttpResponse, Method, Payload, PoolStrategy, ProxySpec, RequestBody, RequestDescriptor,
    TimeoutBudget, Transport, TransportConfig, TransportError, TransportResult,
};

use super::scope::{ConnectionScope, StatsCounters, TransportStats};

/// Buffer size used when streaming a download to its sink.
pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Placeholder for an error body that could not be read.
const UNREADABLE_BODY: &str = "<unreadable body>";

/// HTTP transport that opens a dedicated connection for every request.
pub struct NoPoolTransport {
    config: TransportConfig,
    /// Only populated for [`PoolStrategy::SharedNoIdle`]; taken on close.
    shared: RwLock<Option<Client>>,
    limiter: Option<Arc<Semaphore>>,
    closed: AtomicBool,
    stats: Arc<StatsCounters>,
}

impl NoPoolTransport {
    /// Creates a transport from its configuration.
    ///
    /// # Errors
    /// Returns an error if the shared client (for
    /// [`PoolStrategy::SharedNoIdle`]) cannot be built.
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification is DISABLED for this transport");
        }

        let shared = match config.strategy {
            PoolStrategy::SharedNoIdle => Some(build_client(
                &config,
                &config.timeouts,
                config.proxy.as_ref(),
            )?),
            PoolStrategy::FreshClient => None,
        };
        let limiter = config
            .max_in_flight
            .map(|max| Arc::new(Semaphore::new(max.max(1))));

        let proxy = config
            .proxy
            .as_ref()
            .map_or_else(|| "none".to_string(), ProxySpec::url);
        info!(
            strategy = %config.strategy,
            connect_timeout_ms = config.timeouts.connect.as_millis() as u64,
            read_timeout_ms = config.timeouts.read.as_millis() as u64,
            total_timeout_ms = config.timeouts.total.as_millis() as u64,
            proxy = %proxy,
            max_in_flight = ?config.max_in_flight,
            "No-pool transport initialized"
        );

        Ok(Self {
            config,
            shared: RwLock::new(shared),
            limiter,
            closed: AtomicBool::new(false),
            stats: Arc::new(StatsCounters::default()),
        })
    }

    /// Creates a transport with default configuration.
    pub fn with_defaults() -> TransportResult<Self> {
        Self::new(TransportConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns a snapshot of the request counters.
    pub fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }

    /// Number of requests currently holding a connection scope.
    pub fn in_flight(&self) -> usize {
        self.stats.snapshot().in_flight
    }

    /// Returns whether [`close`](Transport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// POSTs a JSON body and decodes the response.
    pub async fn post_json(&self, url: &str, body: Value) -> TransportResult<Payload> {
        let response = self.execute(RequestDescriptor::post(url).json(body)).await?;
        Ok(response.decode())
    }

    /// GETs a URL and returns the raw body.
    pub async fn get(&self, url: &str) -> TransportResult<Bytes> {
        let response = self.execute(RequestDescriptor::get(url)).await?;
        Ok(response.into_bytes())
    }

    /// Acquires a permit and a client for one request.
    async fn open(&self, request: &RequestDescriptor) -> TransportResult<ConnectionScope> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let permit = match &self.limiter {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|_| TransportError::Closed)?,
            ),
            None => None,
        };

        let overrides = request.timeout_overrides();
        let budget = self.config.timeouts.with_overrides(overrides);
        let shared_fits = overrides.connect.is_none() && overrides.read.is_none();

        let client = match (self.config.strategy, request.proxy_spec()) {
            (PoolStrategy::SharedNoIdle, None) if shared_fits => {
                let shared = self.shared.read().clone();
                shared.ok_or(TransportError::Closed)?
            }
            // Per-request proxies and connect/read timeouts are fixed at
            // build time, so the shared client cannot carry them.
            (_, proxy) => build_client(
                &self.config,
                &budget,
                proxy.or(self.config.proxy.as_ref()),
            )?,
        };

        Ok(ConnectionScope::open(
            client,
            budget.total,
            permit,
            Arc::clone(&self.stats),
        ))
    }

    /// Sends the request and checks the status.
    async fn send(
        &self,
        scope: &ConnectionScope,
        request: &RequestDescriptor,
        url: &str,
    ) -> TransportResult<Response> {
        debug!("Sending request");
        let builder = prepare(scope, request)?;
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, url))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| UNREADABLE_BODY.to_string());
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn execute_in_scope(
        &self,
        request: &RequestDescriptor,
        url: &str,
    ) -> TransportResult<HttpResponse> {
        let scope = self.open(request).await?;
        let result: TransportResult<HttpResponse> = async {
            let response = self.send(&scope, request, url).await?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| map_reqwest_error(e, url))?;
            Ok(HttpResponse::new(status, body))
        }
        .await;

        self.stats.record(&result);
        match &result {
            Ok(response) => debug!(
                status = response.status,
                bytes = response.body.len(),
                elapsed_ms = scope.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Err(e) => debug!(
                error = %e,
                elapsed_ms = scope.elapsed().as_millis() as u64,
                "Request failed"
            ),
        }
        result
    }

    async fn download_in_scope(
        &self,
        request: &RequestDescriptor,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<u64> {
        let scope = self.open(request).await?;
        let result: TransportResult<u64> = async {
            let mut response = self.send(&scope, request, url).await?;
            let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, sink);
            let mut written = 0u64;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| map_reqwest_error(e, url))?
            {
                writer.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            writer.flush().await?;
            Ok(written)
        }
        .await;

        self.stats.record(&result);
        if let Ok(written) = &result {
            debug!(
                bytes = written,
                elapsed_ms = scope.elapsed().as_millis() as u64,
                "Download completed"
            );
        }
        result
    }
}

#[async_trait]
impl Transport for NoPoolTransport {
    async fn execute(&self, request: RequestDescriptor) -> TransportResult<HttpResponse> {
        let url = request.redacted_url();
        let span = info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %request.method(),
            url = %url,
        );
        self.execute_in_scope(&request, &url).instrument(span).await
    }

    async fn download(
        &self,
        request: RequestDescriptor,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<u64> {
        let url = request.redacted_url();
        let span = info_span!(
            "download",
            id = %Uuid::new_v4(),
            method = %request.method(),
            url = %url,
        );
        self.download_in_scope(&request, &url, sink)
            .instrument(span)
            .await
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("No-pool transport already closed");
            return Ok(());
        }
        self.shared.write().take();
        if let Some(limiter) = &self.limiter {
            limiter.close();
        }
        info!(in_flight = self.in_flight(), "No-pool transport closed");
        Ok(())
    }
}

impl fmt::Debug for NoPoolTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoPoolTransport")
            .field("strategy", &self.config.strategy)
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Builds a client that keeps no idle connections.
fn build_client(
    config: &TransportConfig,
    budget: &TimeoutBudget,
    proxy: Option<&ProxySpec>,
) -> TransportResult<Client> {
    let builder = ClientBuilder::new()
        .connect_timeout(budget.connect)
        .read_timeout(budget.read)
        .timeout(budget.total)
        .pool_max_idle_per_host(0)
        .http1_only()
        .user_agent(config.user_agent.clone())
        .danger_accept_invalid_certs(config.accept_invalid_certs);

    let builder = match proxy {
        Some(spec) => {
            let mut proxy = Proxy::all(spec.url()).map_err(|e| TransportError::InvalidProxy {
                proxy: spec.url(),
                reason: e.to_string(),
            })?;
            if let Some(creds) = spec.credentials() {
                proxy = proxy.basic_auth(&creds.username, &creds.password);
            }
            builder.proxy(proxy)
        }
        None if !config.trust_env => builder.no_proxy(),
        None => builder,
    };

    builder
        .build()
        .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {e}")))
}

/// Translates a descriptor into a reqwest request on the scope's client.
fn prepare(scope: &ConnectionScope, request: &RequestDescriptor) -> TransportResult<RequestBuilder> {
    let method = match request.method() {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
    };

    let mut builder = scope
        .client()
        .request(method, request.url())
        .header(CONNECTION, "close")
        .timeout(scope.total_timeout());

    if !request.query_pairs().is_empty() {
        builder = builder.query(request.query_pairs());
    }

    for (name, value) in request.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            TransportError::InvalidRequest(format!("invalid header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            TransportError::InvalidRequest(format!("invalid value for header '{name}': {e}"))
        })?;
        builder = builder.header(header_name, header_value);
    }

    // Header overrides go first so an explicit Content-Type wins over .json().
    let builder = match request.request_body() {
        Some(RequestBody::Json(value)) => builder.json(value),
        Some(RequestBody::Form(pairs)) => builder.form(pairs),
        Some(RequestBody::Raw {
            bytes,
            content_type,
        }) => {
            let builder = builder.body(bytes.clone());
            match content_type {
                Some(ct) => builder.header(CONTENT_TYPE, ct.as_str()),
                None => builder,
            }
        }
        None => builder,
    };

    Ok(builder)
}

/// Maps a reqwest error, dropping the URL it embeds (it may carry a token).
fn map_reqwest_error(err: reqwest::Error, url: &str) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::connection(url, err.without_url())
    }
}
