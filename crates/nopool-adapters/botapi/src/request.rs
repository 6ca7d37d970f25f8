//! The request contract consumed by the bot-API client, and its
//! no-pool implementation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use nopool_core::{
    BoxedTransport, Method, RequestDescriptor, TimeoutOverrides, TransportConfig, redact_url,
};
use nopool_transport::NoPoolTransport;

use crate::envelope::{into_value, unwrap_envelope};
use crate::error::{AdapterError, AdapterResult};

// =============================================================================
// BaseRequest trait
// =============================================================================

/// Request backend used by the bot-API client.
///
/// The client hands over a URL and a payload and expects either the
/// unwrapped result or an error; it never sees connections or pools.
#[async_trait]
pub trait BaseRequest: Send + Sync {
    /// Prepares the backend for use.
    async fn initialize(&self) -> AdapterResult<()>;

    /// Releases the backend. Calling it twice is a no-op.
    async fn shutdown(&self) -> AdapterResult<()>;

    /// POSTs `data` as JSON and returns the translated envelope.
    ///
    /// See [`translate`](crate::envelope::translate) for the unwrapping rules.
    async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value>;

    /// POSTs `data` as JSON and returns the decoded body without unwrapping
    /// the envelope.
    async fn post_raw(
        &self,
        url: &str,
        data: Option<Value>,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value>;

    /// Generic entry point; only `POST` (any case) is accepted.
    async fn do_request(
        &self,
        url: &str,
        method: &str,
        data: Option<Value>,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value> {
        match method.parse::<Method>() {
            Ok(Method::Post) => self.post(url, data, timeouts).await,
            _ => Err(AdapterError::UnsupportedMethod(method.to_string())),
        }
    }

    /// GETs a URL and returns the raw body (file downloads).
    async fn retrieve(&self, url: &str) -> AdapterResult<Bytes>;

    /// Downloads a URL into a local file and returns the bytes written.
    ///
    /// The default implementation buffers the body through
    /// [`retrieve`](Self::retrieve).
    async fn download(&self, url: &str, dest: &Path) -> AdapterResult<u64> {
        let body = self.retrieve(url).await?;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Lifecycle of a [`NoPoolRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed; requests are already allowed.
    Created,
    /// `initialize` has been called.
    Active,
    /// `shutdown` has been called; every call fails with
    /// [`AdapterError::Closed`].
    ShutDown,
}

// =============================================================================
// NoPoolRequest
// =============================================================================

/// [`BaseRequest`] that sends every call over its own connection.
pub struct NoPoolRequest {
    transport: BoxedTransport,
    state: RwLock<LifecycleState>,
}

impl NoPoolRequest {
    /// Wraps an existing transport.
    pub fn new(transport: BoxedTransport) -> Self {
        Self {
            transport,
            state: RwLock::new(LifecycleState::Created),
        }
    }

    /// Builds a [`NoPoolTransport`] from `config` and wraps it.
    pub fn from_config(config: TransportConfig) -> AdapterResult<Self> {
        let proxy = config.proxy.as_ref().map(|p| p.url());
        let transport = NoPoolTransport::new(config)?;
        info!(proxy = ?proxy, "No-pool request adapter created");
        Ok(Self::new(Arc::new(transport)))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// The underlying transport.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    fn ensure_open(&self) -> AdapterResult<()> {
        match self.state() {
            LifecycleState::ShutDown => Err(AdapterError::Closed),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BaseRequest for NoPoolRequest {
    async fn initialize(&self) -> AdapterResult<()> {
        let mut state = self.state.write();
        match *state {
            LifecycleState::Created => {
                *state = LifecycleState::Active;
                info!("No-pool request adapter initialized (no persistent session)");
                Ok(())
            }
            LifecycleState::Active => Ok(()),
            LifecycleState::ShutDown => Err(AdapterError::Closed),
        }
    }

    async fn shutdown(&self) -> AdapterResult<()> {
        {
            let mut state = self.state.write();
            if *state == LifecycleState::ShutDown {
                debug!("No-pool request adapter already shut down");
                return Ok(());
            }
            *state = LifecycleState::ShutDown;
        }

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Failed to close transport during shutdown");
        }
        info!("No-pool request adapter shut down");
        Ok(())
    }

    async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value> {
        let raw = self.post_raw(url, data, timeouts).await?;
        Ok(unwrap_envelope(raw))
    }

    async fn post_raw(
        &self,
        url: &str,
        data: Option<Value>,
        timeouts: TimeoutOverrides,
    ) -> AdapterResult<Value> {
        self.ensure_open()?;

        let mut request = RequestDescriptor::post(url).timeouts(timeouts);
        if let Some(data) = data {
            request = request.json(data);
        }

        debug!(url = %redact_url(url), "Posting bot API request");
        let response = self.transport.execute(request).await?;
        Ok(into_value(response.decode()))
    }

    async fn retrieve(&self, url: &str) -> AdapterResult<Bytes> {
        self.ensure_open()?;
        let response = self.transport.execute(RequestDescriptor::get(url)).await?;
        Ok(response.into_bytes())
    }

    async fn download(&self, url: &str, dest: &Path) -> AdapterResult<u64> {
        self.ensure_open()?;

        let mut file = tokio::fs::File::create(dest).await?;
        let result = self
            .transport
            .download(RequestDescriptor::get(url), &mut file)
            .await;
        drop(file);

        match result {
            Ok(written) => {
                debug!(url = %redact_url(url), bytes = written, dest = %dest.display(), "File downloaded");
                Ok(written)
            }
            Err(e) => {
                // Don't leave a truncated file behind.
                let _ = tokio::fs::remove_file(dest).await;
                Err(e.into())
            }
        }
    }
}

impl fmt::Debug for NoPoolRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoPoolRequest")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nopool_core::{HttpResponse, Transport, TransportError, TransportResult};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that answers every request with a canned response.
    pub(crate) struct FakeTransport {
        pub(crate) response: Mutex<TransportResult<HttpResponse>>,
        pub(crate) seen: Mutex<Vec<RequestDescriptor>>,
        pub(crate) closes: AtomicUsize,
    }

    impl FakeTransport {
        pub(crate) fn replying(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                response: Mutex::new(Ok(HttpResponse::new(status, body))),
                seen: Mutex::new(Vec::new()),
                closes: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(err: TransportError) -> Arc<Self> {
            let fake = Self::replying(200, "");
            *fake.response.lock() = Err(err);
            fake
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, request: RequestDescriptor) -> TransportResult<HttpResponse> {
            self.seen.lock().push(request);
            match &*self.response.lock() {
                Ok(response) => Ok(response.clone()),
                Err(TransportError::Timeout { url }) => {
                    Err(TransportError::Timeout { url: url.clone() })
                }
                Err(TransportError::Status { url, status, body }) => Err(TransportError::Status {
                    url: url.clone(),
                    status: *status,
                    body: body.clone(),
                }),
                Err(_) => Err(TransportError::Closed),
            }
        }

        async fn close(&self) -> TransportResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn adapter(fake: &Arc<FakeTransport>) -> NoPoolRequest {
        NoPoolRequest::new(Arc::clone(fake) as BoxedTransport)
    }

    #[tokio::test]
    async fn test_post_unwraps_successful_envelope() {
        let fake = FakeTransport::replying(200, r#"{"ok": true, "result": {"id": 42}}"#);
        let request = adapter(&fake);

        let result = request
            .post(
                "https://api.example/bot1:abc/getMe",
                Some(json!({"a": 1})),
                TimeoutOverrides::NONE,
            )
            .await
            .unwrap();
        assert_eq!(result, json!({"id": 42}));

        let seen = fake.seen.lock();
        assert_eq!(seen[0].method(), Method::Post);
        assert!(matches!(
            seen[0].request_body(),
            Some(nopool_core::RequestBody::Json(body)) if body == &json!({"a": 1})
        ));
    }

    #[tokio::test]
    async fn test_post_returns_failed_envelope_whole() {
        let fake = FakeTransport::replying(200, r#"{"ok": false, "description": "Unauthorized"}"#);
        let result = adapter(&fake)
            .post("http://h/x", None, TimeoutOverrides::NONE)
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": false, "description": "Unauthorized"}));
        assert!(fake.seen.lock()[0].request_body().is_none());
    }

    #[tokio::test]
    async fn test_post_raw_keeps_envelope() {
        let fake = FakeTransport::replying(200, r#"{"ok": true, "result": {"id": 42}}"#);
        let result = adapter(&fake)
            .post_raw("http://h/x", None, TimeoutOverrides::NONE)
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true, "result": {"id": 42}}));
    }

    #[tokio::test]
    async fn test_post_text_body_becomes_string() {
        let fake = FakeTransport::replying(200, "not json");
        let result = adapter(&fake)
            .post("http://h/x", None, TimeoutOverrides::NONE)
            .await
            .unwrap();
        assert_eq!(result, json!("not json"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_wrapped() {
        let fake = FakeTransport::failing(TransportError::Status {
            url: "http://h/x".into(),
            status: 500,
            body: "server error".into(),
        });
        let err = adapter(&fake)
            .post("http://h/x", None, TimeoutOverrides::NONE)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("HTTP request failed:"));
        assert!(message.contains("500"));
        assert!(message.contains("server error"));
    }

    #[tokio::test]
    async fn test_do_request_only_accepts_post() {
        let fake = FakeTransport::replying(200, r#"{"ok": true, "result": true}"#);
        let request = adapter(&fake);

        let result = request
            .do_request("http://h/x", "post", None, TimeoutOverrides::NONE)
            .await
            .unwrap();
        assert_eq!(result, json!(true));

        for method in ["GET", "PUT", "delete"] {
            let err = request
                .do_request("http://h/x", method, None, TimeoutOverrides::NONE)
                .await
                .unwrap_err();
            assert!(matches!(err, AdapterError::UnsupportedMethod(ref m) if m == method));
        }
        assert_eq!(fake.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let fake = FakeTransport::replying(200, "{}");
        let request = adapter(&fake);
        assert_eq!(request.state(), LifecycleState::Created);

        // Requests are allowed before initialize.
        request.retrieve("http://h/file").await.unwrap();

        request.initialize().await.unwrap();
        assert_eq!(request.state(), LifecycleState::Active);

        request.shutdown().await.unwrap();
        request.shutdown().await.unwrap();
        assert_eq!(request.state(), LifecycleState::ShutDown);
        assert_eq!(fake.closes.load(Ordering::SeqCst), 1);

        let err = request
            .post("http://h/x", None, TimeoutOverrides::NONE)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Closed));
        assert!(err.is_fatal());
        assert!(matches!(
            request.initialize().await.unwrap_err(),
            AdapterError::Closed
        ));
        assert_eq!(fake.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let fake = FakeTransport::replying(200, "file-content");
        let request = adapter(&fake);
        let dest = std::env::temp_dir().join(format!("nopool-adapter-{}.txt", std::process::id()));

        let written = request.download("http://h/file", &dest).await.unwrap();
        assert_eq!(written, 12);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"file-content");
        tokio::fs::remove_file(&dest).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_download_removes_file() {
        let fake = FakeTransport::failing(TransportError::Timeout {
            url: "http://h/file".into(),
        });
        let request = adapter(&fake);
        let dest = std::env::temp_dir().join(format!("nopool-adapter-fail-{}.txt", std::process::id()));

        let err = request.download("http://h/file", &dest).await.unwrap_err();
        assert!(err.is_timeout());
        assert!(!dest.exists());
    }
}
