//! Flush bookkeeping for the buffered database sink

use crate::core::LogLevel;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Why a buffer was handed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// `buffer_size` documents are waiting
    Capacity,
    /// A record at or above `flush_level` arrived
    Severity,
    /// `flush_interval` passed since the last flush
    Interval,
    /// Explicit flush or close
    Requested,
}

/// Upper bound on the slots reserved up front; larger buffers grow on demand
const PREALLOCATE_LIMIT: usize = 1024;

pub(crate) struct RecordBuffer {
    documents: Vec<Value>,
    capacity: usize,
    flush_level: LogLevel,
    interval: Duration,
    last_flush: Instant,
}

impl RecordBuffer {
    pub(crate) fn new(capacity: usize, flush_level: LogLevel, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            documents: Vec::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
            flush_level,
            interval,
            last_flush: Instant::now(),
        }
    }

    /// Buffer a document and report whether it triggers a flush
    pub(crate) fn push(&mut self, document: Value, level: LogLevel) -> Option<FlushReason> {
        self.documents.push(document);
        if level >= self.flush_level {
            Some(FlushReason::Severity)
        } else if self.documents.len() >= self.capacity {
            Some(FlushReason::Capacity)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.documents.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Non-empty and the interval has elapsed since the last flush
    pub(crate) fn is_due(&self, now: Instant) -> bool {
        !self.is_empty() && now.saturating_duration_since(self.last_flush) >= self.interval
    }

    /// How long the worker may sleep before the interval rule applies.
    /// An empty buffer has nothing to flush, so it waits a full interval.
    pub(crate) fn time_until_due(&self, now: Instant) -> Duration {
        if self.is_empty() {
            return self.interval;
        }
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_flush))
    }

    /// Take the buffered documents and restart the interval clock
    pub(crate) fn take(&mut self, now: Instant) -> Vec<Value> {
        self.last_flush = now;
        std::mem::replace(
            &mut self.documents,
            Vec::with_capacity(self.capacity.min(PREALLOCATE_LIMIT)),
        )
    }
}
