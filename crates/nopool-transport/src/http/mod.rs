//! HTTP transport with one connection per request.

mod client;
mod scope;

pub use client::{DOWNLOAD_CHUNK_SIZE, NoPoolTransport};
pub use scope::TransportStats;
