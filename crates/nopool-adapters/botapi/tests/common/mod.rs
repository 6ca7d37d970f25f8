//! Loopback bot-API server that counts connections.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TOKEN: &str = "123:abc";

/// Bytes served under `/file/bot<token>/`.
pub const FILE_BODY: &[u8] = b"\x89PNG file";

#[derive(Default)]
struct State {
    accepted: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

pub struct BotServer {
    base: String,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl BotServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(State::default());

        let accept_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_state.accepted.fetch_add(1, Ordering::SeqCst);
                let io = TokioIo::new(stream);
                let conn_state = Arc::clone(&accept_state);
                tokio::spawn(async move {
                    let service = service_fn(move |req| route(req, Arc::clone(&conn_state)));
                    let _ = http1::Builder::new().serve_connection(io, service).await;
                });
            }
        });

        Self {
            base: format!("http://{addr}"),
            state,
            handle,
        }
    }

    /// Value for `BotApi::with_api_base`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn method_url(&self, method: &str) -> String {
        self.url(&format!("/bot{TOKEN}/{method}"))
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// JSON bodies of every method call, in arrival order.
    pub fn bodies(&self) -> Vec<Value> {
        self.state.bodies.lock().clone()
    }
}

impl Drop for BotServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn route(
    req: Request<Incoming>,
    state: Arc<State>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let body = req
        .into_body()
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();
    if let Ok(value) = serde_json::from_slice::<Value>(&body) {
        state.bodies.lock().push(value);
    }

    let method_prefix = format!("/bot{TOKEN}/");
    let file_prefix = format!("/file/bot{TOKEN}/");
    let response = if let Some(method) = path.strip_prefix(&method_prefix) {
        let envelope = match method {
            "getMe" => json!({ "ok": true, "result": { "id": 42, "is_bot": true } }),
            "sendMessage" => json!({ "ok": true, "result": { "message_id": 7 } }),
            "getChat" => json!({ "ok": false, "error_code": 400, "description": "Bad Request: chat not found" }),
            _ => json!({ "ok": false, "error_code": 404, "description": "Not Found" }),
        };
        reply(StatusCode::OK, envelope.to_string())
    } else if path.starts_with(&file_prefix) {
        reply(StatusCode::OK, Bytes::from_static(FILE_BODY))
    } else if path == "/error" {
        reply(StatusCode::INTERNAL_SERVER_ERROR, "server error")
    } else {
        reply(StatusCode::NOT_FOUND, "no such route")
    };
    Ok(response)
}

fn reply(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}
