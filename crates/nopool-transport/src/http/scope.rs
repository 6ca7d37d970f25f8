//! Per-request connection scope and instance statistics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::OwnedSemaphorePermit;
use tracing::trace;

/// Snapshot of a transport's request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Requests that acquired a connection scope.
    pub started: u64,
    /// Requests that returned a response.
    pub succeeded: u64,
    /// Requests that returned an error.
    pub failed: u64,
    /// Scopes currently alive.
    pub in_flight: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicUsize,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> TransportStats {
        TransportStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
        }
    }

    pub(crate) fn record<T, E>(&self, result: &Result<T, E>) {
        let counter = if result.is_ok() {
            &self.succeeded
        } else {
            &self.failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Owns everything one request holds: its client, its concurrency permit
/// and its slot in the in-flight gauge.
///
/// Dropping the scope releases all of them, whichever way the request
/// ended (response, error, timeout or a dropped future).
pub(crate) struct ConnectionScope {
    client: Client,
    total_timeout: Duration,
    stats: Arc<StatsCounters>,
    opened_at: Instant,
    _permit: Option<OwnedSemaphorePermit>,
}

impl ConnectionScope {
    pub(crate) fn open(
        client: Client,
        total_timeout: Duration,
        permit: Option<OwnedSemaphorePermit>,
        stats: Arc<StatsCounters>,
    ) -> Self {
        stats.started.fetch_add(1, Ordering::Relaxed);
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            client,
            total_timeout,
            stats,
            opened_at: Instant::now(),
            _permit: permit,
        }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn total_timeout(&self) -> Duration {
        self.total_timeout
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        trace!(
            elapsed_ms = self.opened_at.elapsed().as_millis() as u64,
            "Connection scope released"
        );
    }
}
