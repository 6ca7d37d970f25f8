//! # nopool transport
//!
//! [`Transport`](nopool_core::Transport) implementation that never reuses
//! a connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Adapter Layer      │  (Bot-API envelope, lifecycle)
//! ├─────────────────────┤
//! │  nopool-core        │  (Transport trait, descriptors)
//! ├─────────────────────┤
//! │  nopool-transport   │  <- This crate (implementation)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! ## Strategies
//!
//! | Strategy | Client lifetime | Use Case |
//! |----------|-----------------|----------|
//! | `FreshClient` | One per request | Hosts where reused sockets go stale |
//! | `SharedNoIdle` | One per transport, idle pool of zero | Lower setup cost |
//!
//! Both send `Connection: close` over HTTP/1.1, so the server tears the
//! socket down after each response.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nopool_core::{RequestDescriptor, Transport, TransportConfig};
//! use nopool_transport::NoPoolTransport;
//!
//! let transport = NoPoolTransport::new(TransportConfig::new().with_max_in_flight(8))?;
//! let response = transport
//!     .execute(RequestDescriptor::post("https://api.telegram.org/bot<token>/getMe"))
//!     .await?;
//! println!("{:?}", response.decode());
//! transport.close().await?;
//! ```

pub mod http;

pub use http::{DOWNLOAD_CHUNK_SIZE, NoPoolTransport, TransportStats};
