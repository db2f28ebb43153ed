//! Handler metrics for observability
//!
//! Counters describing what happened to the records a handler received:
//! written, filtered out, dropped, and for buffered sinks how batches were
//! delivered.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for one handler
///
/// # Example
///
/// ```
/// use commandcenter_logging::HandlerMetrics;
///
/// let metrics = HandlerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_handled();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_handled(), 1);
/// ```
#[derive(Debug)]
pub struct HandlerMetrics {
    /// Records accepted by the sink
    handled: AtomicU64,

    /// Records lost: sink errors, full queues, exhausted retries
    dropped: AtomicU64,

    /// Records rejected by a filter or the handler level
    filtered: AtomicU64,

    /// Buffer flushes attempted
    flushes: AtomicU64,

    /// Batches stored successfully
    delivered_batches: AtomicU64,

    /// Records inside successfully stored batches
    delivered_records: AtomicU64,

    /// Delivery attempts beyond the first
    retries: AtomicU64,

    /// Batches discarded after the retry budget ran out
    failed_batches: AtomicU64,
}

impl HandlerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            handled: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            delivered_batches: AtomicU64::new(0),
            delivered_records: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            failed_batches: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered_batches(&self) -> u64 {
        self.delivered_batches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered_records(&self) -> u64 {
        self.delivered_records.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retry_count(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_batches(&self) -> u64 {
        self.failed_batches.load(Ordering::Relaxed)
    }

    /// Record a dropped record, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `count` dropped records at once, returning the previous count
    #[inline]
    pub fn record_dropped_many(&self, count: u64) -> u64 {
        self.dropped.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_handled(&self) -> u64 {
        self.handled.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a stored batch of `records` documents
    #[inline]
    pub fn record_delivered(&self, records: u64) {
        self.delivered_batches.fetch_add(1, Ordering::Relaxed);
        self.delivered_records.fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry(&self) -> u64 {
        self.retries.fetch_add(1, Ordering::Relaxed)
    }

    /// Record a discarded batch of `records` documents
    #[inline]
    pub fn record_failed_batch(&self, records: u64) -> u64 {
        self.record_dropped_many(records);
        self.failed_batches.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no records have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_handled() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        for counter in [
            &self.handled,
            &self.dropped,
            &self.filtered,
            &self.flushes,
            &self.delivered_batches,
            &self.delivered_records,
            &self.retries,
            &self.failed_batches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for HandlerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HandlerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            handled: AtomicU64::new(self.total_handled()),
            dropped: AtomicU64::new(self.dropped_count()),
            filtered: AtomicU64::new(self.filtered_count()),
            flushes: AtomicU64::new(self.flush_count()),
            delivered_batches: AtomicU64::new(self.delivered_batches()),
            delivered_records: AtomicU64::new(self.delivered_records()),
            retries: AtomicU64::new(self.retry_count()),
            failed_batches: AtomicU64::new(self.failed_batches()),
        }
    }
}
