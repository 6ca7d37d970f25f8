//! The transport seam.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::TransportResult;
use crate::payload::HttpResponse;
use crate::request::RequestDescriptor;

/// Executes requests, each on its own connection.
///
/// Implementations must release every connection resource before a call
/// returns, on every exit path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one request and returns the full response.
    ///
    /// # Errors
    /// Returns a [`TransportError`](crate::TransportError) on timeout, on a
    /// status of 400 or above, or on any connection failure.
    async fn execute(&self, request: RequestDescriptor) -> TransportResult<HttpResponse>;

    /// Executes one request and writes the body into `sink`.
    ///
    /// Returns the number of bytes written. The default implementation
    /// buffers the whole body first.
    async fn download(
        &self,
        request: RequestDescriptor,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> TransportResult<u64> {
        let response = self.execute(request).await?;
        sink.write_all(&response.body).await?;
        sink.flush().await?;
        Ok(response.body.len() as u64)
    }

    /// Releases anything the transport holds. Must be idempotent.
    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;
