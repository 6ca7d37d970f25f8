//! # nopool core
//!
//! Shared types for the nopool per-request HTTP transport.
//!
//! Every request is described by a [`RequestDescriptor`] and executed by a
//! [`Transport`] on a connection that lives exactly as long as that one
//! request. This crate holds the pieces both sides agree on:
//!
//! - **Requests**: [`RequestDescriptor`], [`RequestBody`], [`Method`]
//! - **Proxies**: [`ProxySpec`] parsed from `scheme://[user:pass@]host:port`
//! - **Timeouts**: [`TimeoutBudget`] per transport, [`TimeoutOverrides`] per call
//! - **Responses**: [`HttpResponse`] and its decoded [`Payload`]
//! - **Errors**: [`TransportError`]
//!
//! ```text
//! ┌──────────────────┐
//! │  Bot-API client  │
//! ├──────────────────┤
//! │  Adapter         │  (envelope translation, lifecycle)
//! ├──────────────────┤
//! │  Transport trait │  <- this crate
//! ├──────────────────┤
//! │  NoPoolTransport │  (one connection per request)
//! └──────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod payload;
pub mod proxy;
pub mod request;
pub mod timeouts;
pub mod transport;

pub use config::{PoolStrategy, TransportConfig};
pub use error::{BoxError, TransportError, TransportResult};
pub use payload::{HttpResponse, Payload};
pub use proxy::{ProxyCredentials, ProxySpec};
pub use request::{Method, RequestBody, RequestDescriptor, redact_url};
pub use timeouts::{TimeoutBudget, TimeoutOverrides};
pub use transport::{BoxedTransport, Transport};
