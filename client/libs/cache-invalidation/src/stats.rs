//! Statistics tracking for cache invalidation operations

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for invalidation operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationStats {
    pub messages_published: u64,
    pub messages_received: u64,
    /// Messages a slow subscriber never saw because the channel overflowed
    pub messages_lagged: u64,
    pub errors: u64,
}

/// Thread-safe statistics collector
#[derive(Clone, Default)]
pub struct StatsCollector {
    messages_published: Arc<AtomicU64>,
    messages_received: Arc<AtomicU64>,
    messages_lagged: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl StatsCollector {
    /// Create new statistics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record message published
    pub fn record_publish(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record message received
    pub fn record_receive(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record messages skipped by a lagging subscriber
    pub fn record_lagged(&self, skipped: u64) {
        self.messages_lagged.fetch_add(skipped, Ordering::Relaxed);
    }

    /// Record error
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> InvalidationStats {
        InvalidationStats {
            messages_published: self.messages_published.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_lagged: self.messages_lagged.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
