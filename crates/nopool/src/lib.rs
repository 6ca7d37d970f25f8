//! # nopool
//!
//! A bot-API HTTP transport that never reuses a connection.
//!
//! ## Overview
//!
//! Long-lived connection pools go stale behind some corporate proxies and
//! end in "pool timeout" errors. nopool opens a dedicated connection for
//! every request, sends `Connection: close`, and releases everything when
//! the request finishes, fails, times out or is cancelled.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────────┐
//! │   BotApi /   │────▶│ NoPoolRequest  │────▶│ NoPoolTransport │──▶ one socket
//! │  bot client  │     │ (envelope,     │     │ (scope guard,   │    per request
//! └──────────────┘     │  lifecycle)    │     │  proxy, limits) │
//!                      └────────────────┘     └─────────────────┘
//! ```
//!
//! - **Runtime**: loads configuration, sets up logging, builds the stack
//! - **Adapter**: `BaseRequest` contract and bot-API envelope handling
//! - **Transport**: per-request connections over reqwest
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nopool::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = NoPoolRuntime::load()?;
//!     runtime.initialize().await?;
//!
//!     let bot = runtime.bot_api()?;
//!     let me = bot.get_me().await?;
//!     info!(username = %me["username"], "Connected");
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use nopool_adapter_botapi as adapter;
pub use nopool_core as core;
pub use nopool_runtime as runtime;
pub use nopool_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use nopool::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use nopool_runtime::{NoPoolConfig, NoPoolRuntime, RuntimeError};

    // Adapter
    pub use nopool_adapter_botapi::{AdapterError, BaseRequest, BotApi, NoPoolRequest};

    // Transport
    pub use nopool_core::{
        PoolStrategy, ProxySpec, RequestDescriptor, TimeoutBudget, TimeoutOverrides, Transport,
        TransportConfig, TransportError,
    };
    pub use nopool_transport::NoPoolTransport;

    // Logging macros
    pub use nopool_runtime::prelude::*;
}
