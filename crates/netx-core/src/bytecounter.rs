//! Atomic counters of bytes sent and received.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts bytes flowing through a transport
#[derive(Debug, Default)]
pub struct ByteCounter {
    sent: AtomicU64,
    received: AtomicU64,
}

impl ByteCounter {
    /// Create a counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_bytes_sent(&self, count: u64) {
        self.sent.fetch_add(count, Ordering::Relaxed);
    }

    pub fn count_bytes_received(&self, count: u64) {
        self.received.fetch_add(count, Ordering::Relaxed);
    }

    #[must_use]
    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Kibibytes sent, as reported in measurement summaries
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn kibibytes_sent(&self) -> f64 {
        self.bytes_sent() as f64 / 1024.0
    }

    /// Kibibytes received, as reported in measurement summaries
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn kibibytes_received(&self) -> f64 {
        self.bytes_received() as f64 / 1024.0
    }
}
