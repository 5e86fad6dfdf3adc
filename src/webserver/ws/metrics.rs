/// WebSocket metrics collection
///
/// Hub-wide and per-connection counters for monitoring and debugging.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// CONNECTION METRICS
// ============================================================================

/// Per-connection metrics (thread-safe)
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Frames written to the socket (snapshot, broadcasts, replies)
    frames_sent: AtomicU64,

    /// Text frames read from the socket
    frames_received: AtomicU64,

    /// Queued broadcasts skipped because the snapshot already covered them
    frames_skipped: AtomicU64,

    /// Submissions rejected by the rate limiter
    rate_limited: AtomicU64,

    /// Inbound frames that failed to decode
    decode_errors: AtomicU64,
}

impl ConnectionMetrics {
    /// Create new metrics tracker
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot for logging
    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_skipped: u64,
    pub rate_limited: u64,
    pub decode_errors: u64,
}

// ============================================================================
// HUB METRICS
// ============================================================================

/// Hub-level metrics (aggregate across all connections)
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total registrations (lifetime)
    total_connections: AtomicU64,

    /// Currently registered clients
    active_connections: AtomicUsize,

    /// Events fanned out
    broadcasts: AtomicU64,

    /// Frames enqueued across all clients
    frames_enqueued: AtomicU64,

    /// Clients evicted because their queue was full
    slow_consumers_evicted: AtomicU64,

    /// Events dropped because they could not be encoded
    encode_failures: AtomicU64,
}

impl HubMetrics {
    /// Create new hub metrics
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn broadcast_completed(&self, enqueued: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.frames_enqueued.fetch_add(enqueued, Ordering::Relaxed);
    }

    pub fn slow_consumer_evicted(&self) {
        self.slow_consumers_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn encode_failed(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            slow_consumers_evicted: self.slow_consumers_evicted.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: usize,
    pub broadcasts: u64,
    pub frames_enqueued: u64,
    pub slow_consumers_evicted: u64,
    pub encode_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_metrics() {
        let metrics = ConnectionMetrics::new();

        metrics.inc_sent();
        metrics.inc_sent();
        metrics.inc_received();
        metrics.inc_rate_limited();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_sent, 2);
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.rate_limited, 1);
        assert_eq!(snapshot.decode_errors, 0);
    }

    #[test]
    fn test_hub_metrics() {
        let metrics = HubMetrics::new();

        metrics.connection_opened();
        metrics.connection_opened();
        metrics.broadcast_completed(2);
        metrics.slow_consumer_evicted();
        metrics.connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_connections, 2);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.broadcasts, 1);
        assert_eq!(snapshot.frames_enqueued, 2);
        assert_eq!(snapshot.slow_consumers_evicted, 1);
    }
}
