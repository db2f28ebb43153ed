//! Handler: level threshold, filters, formatter and sink bound under one name

use super::{
    appender::Appender,
    error::{LoggerError, Result},
    filter::Filter,
    formatter::Formatter,
    log_level::LogLevel,
    log_record::LogRecord,
    logging::DEFAULT_SHUTDOWN_TIMEOUT,
    metrics::HandlerMetrics,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A named output sink as declared under `handlers` in the configuration.
///
/// Handlers are shared by every logger bound to them, so all methods take
/// `&self`; the sink itself is serialized behind a mutex.
pub struct Handler {
    name: String,
    level: Option<LogLevel>,
    formatter: Arc<dyn Formatter>,
    filters: Vec<Arc<dyn Filter>>,
    appender: Mutex<Box<dyn Appender>>,
    metrics: Arc<HandlerMetrics>,
    closed: AtomicBool,
}

impl Handler {
    pub fn new(
        name: impl Into<String>,
        appender: Box<dyn Appender>,
        formatter: Arc<dyn Formatter>,
    ) -> Self {
        Self {
            name: name.into(),
            level: None,
            formatter,
            filters: Vec::new(),
            appender: Mutex::new(appender),
            metrics: Arc::new(HandlerMetrics::new()),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Share a metrics instance with the sink (buffered sinks record
    /// delivery outcomes into it from their worker thread)
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<HandlerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    pub fn metrics(&self) -> &HandlerMetrics {
        &self.metrics
    }

    pub fn formatter(&self) -> &dyn Formatter {
        self.formatter.as_ref()
    }

    pub fn filter_kinds(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.kind().to_string()).collect()
    }

    /// Class tag of the sink
    pub fn kind(&self) -> String {
        self.appender.lock().name().to_string()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// True when a record at `level` passes this handler's threshold
    #[inline]
    pub fn accepts(&self, level: LogLevel) -> bool {
        self.level.map_or(true, |min| level >= min)
    }

    /// Run a record through level, filters and sink.
    ///
    /// Returns `true` when the sink accepted the record. Sink failures and
    /// panics are reported on stderr and counted, never propagated.
    pub fn handle(&self, record: &LogRecord) -> bool {
        if self.is_closed() {
            self.metrics.record_dropped();
            return false;
        }

        if !self.accepts(record.level) {
            self.metrics.record_filtered();
            return false;
        }

        if self.filters.is_empty() {
            return self.emit(record);
        }

        let mut enriched = record.clone();
        for filter in &self.filters {
            if !filter.filter(&mut enriched) {
                self.metrics.record_filtered();
                return false;
            }
        }
        self.emit(&enriched)
    }

    fn emit(&self, record: &LogRecord) -> bool {
        let mut appender = self.appender.lock();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            appender.append(record, self.formatter.as_ref())
        }));

        match result {
            Ok(Ok(())) => {
                self.metrics.record_handled();
                true
            }
            Ok(Err(e)) => {
                self.report_drop(&format!("failed: {}", e));
                false
            }
            Err(panic_info) => {
                self.report_drop(&format!("panicked: {}", panic_message(&panic_info)));
                false
            }
        }
    }

    /// Count a dropped record, alerting on the first and every 1000th
    fn report_drop(&self, reason: &str) {
        let previous = self.metrics.record_dropped();
        if previous == 0 || (previous + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER ERROR] Handler '{}' {} ({} records dropped so far)",
                self.name,
                reason,
                previous + 1
            );
        }
    }

    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let pending = self.appender.lock().begin_flush()?;
        pending.map_or(Ok(()), |wait| wait())
    }

    /// Flush and release the sink. Later records are dropped.
    pub fn close(&self) -> Result<()> {
        self.close_within(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Like [`close`](Self::close), bounding how long a buffered sink may
    /// spend draining.
    pub fn close_within(&self, timeout: Duration) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let pending = self.appender.lock().begin_shutdown(timeout)?;
            pending.map_or(Ok(()), |wait| wait())
        }))
        .unwrap_or_else(|panic_info| {
            Err(LoggerError::other(format!(
                "handler '{}' panicked while closing: {}",
                self.name,
                panic_message(&panic_info)
            )))
        })
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("formatter", &self.formatter.kind())
            .field("filters", &self.filter_kinds())
            .field("closed", &self.is_closed())
            .finish()
    }
}

pub(crate) fn panic_message(panic_info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
