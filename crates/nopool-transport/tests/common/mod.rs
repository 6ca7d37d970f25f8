//! Loopback HTTP/1.1 server that counts connections.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Size of the `/big` response body.
pub const BIG_BODY_LEN: usize = 200 * 1024;

/// Bytes served by `/bytes`.
pub const BINARY_BODY: &[u8] = &[0xff, 0xfe, 0x00, 0x01, 0x80];

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub connection: Option<String>,
    pub proxy_authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Default)]
struct State {
    accepted: AtomicUsize,
    closed: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    slow_delay_ms: AtomicUsize,
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State::default());
        state.slow_delay_ms.store(500, Ordering::SeqCst);

        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.accepted.fetch_add(1, Ordering::SeqCst);
                let io = TokioIo::new(stream);
                let conn_state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let service_state = Arc::clone(&conn_state);
                    let service =
                        service_fn(move |req| handle_request(req, Arc::clone(&service_state)));
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                    conn_state.closed.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn set_slow_delay(&self, delay: Duration) {
        self.state
            .slow_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Highest number of requests handled at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().clone()
    }

    /// Waits until the server has closed `expected` connections.
    pub async fn wait_for_closed(&self, expected: usize) -> bool {
        for _ in 0..300 {
            if self.closed() >= expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Binds and releases a port so that connecting to it is refused.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<State>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let active = state.active.fetch_add(1, Ordering::SeqCst) + 1;
    state.peak.fetch_max(active, Ordering::SeqCst);
    let response = route(req, &state).await;
    state.active.fetch_sub(1, Ordering::SeqCst);
    Ok(response)
}

async fn route(req: Request<Incoming>, state: &State) -> Response<Full<Bytes>> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let method = req.method().to_string();
    let uri = req.uri().clone();
    let connection = header("connection");
    let proxy_authorization = header("proxy-authorization");
    let content_type = header("content-type");
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    state.requests.lock().push(Recorded {
        method: method.clone(),
        uri: uri.to_string(),
        connection,
        proxy_authorization,
        content_type: content_type.clone(),
        body: body.clone(),
    });

    let path = uri.path();
    match path {
        "/slow" => {
            let delay = state.slow_delay_ms.load(Ordering::SeqCst) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            reply(StatusCode::OK, "slow")
        }
        "/error" => reply(StatusCode::INTERNAL_SERVER_ERROR, "server error"),
        "/empty" => reply(StatusCode::OK, Bytes::new()),
        "/text" => reply(StatusCode::OK, "plain text"),
        "/bytes" => reply(StatusCode::OK, Bytes::from_static(BINARY_BODY)),
        "/big" => {
            let body: Vec<u8> = (0..BIG_BODY_LEN).map(|i| (i % 251) as u8).collect();
            reply(StatusCode::OK, body)
        }
        _ => {
            let echo = serde_json::json!({
                "method": method,
                "path": path,
                "query": uri.query(),
                "content_type": content_type,
                "body": String::from_utf8_lossy(&body),
            });
            reply(StatusCode::OK, echo.to_string())
        }
    }
}

fn reply(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}
