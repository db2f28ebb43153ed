//! Buffered database appender
//!
//! Records are converted to JSON documents on the caller's thread and handed
//! to a worker over a bounded channel. The worker batches them and writes a
//! batch to its [`DocumentStore`] when
//!
//! - `buffer_size` documents are waiting,
//! - a record at or above `flush_level` arrives,
//! - `flush_interval` has passed since the last flush and the buffer is not
//!   empty, or
//! - the handler is flushed or closed.
//!
//! A failed delivery is retried `max_retries` times with exponential backoff
//! and jitter. After that the batch is discarded and counted; logging never
//! blocks on or fails because of the store.

mod buffer;
#[cfg(feature = "http")]
mod http;
mod store;

pub use buffer::FlushReason;
#[cfg(feature = "http")]
pub use http::HttpStore;
pub use store::{DocumentStore, JsonlStore, MemoryStore, StoredBatch};

use crate::core::{
    Appender, Formatter, HandlerMetrics, LogLevel, LogRecord, LoggerError, PendingWait, Result,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
use buffer::RecordBuffer;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use rand::Rng;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_FLUSH_LEVEL: LogLevel = LogLevel::Error;
pub const DEFAULT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// 30 days
pub const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(2_592_000);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted `buffer_size`
pub const MAX_BUFFER_SIZE: usize = 100_000;

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);
const MIN_QUEUE_CAPACITY: usize = 64;
const MAX_QUEUE_CAPACITY: usize = 65_536;

/// Parameters of a `buffered_database` handler
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub connection_url: String,
    pub database_name: String,
    pub collection_name: String,
    pub flush_interval: Duration,
    pub flush_level: LogLevel,
    pub buffer_size: usize,
    pub max_retries: u32,
    pub expire_after: Duration,
    pub retry_backoff: Duration,
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    pub fn new(
        connection_url: impl Into<String>,
        database_name: impl Into<String>,
        collection_name: impl Into<String>,
    ) -> Self {
        Self {
            connection_url: connection_url.into(),
            database_name: database_name.into(),
            collection_name: collection_name.into(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            flush_level: DEFAULT_FLUSH_LEVEL,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            expire_after: DEFAULT_EXPIRE_AFTER,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// URL scheme selecting the document store, e.g. `file` or `https`
    pub fn scheme(&self) -> &str {
        self.connection_url
            .split_once("://")
            .map_or("", |(scheme, _)| scheme)
    }

    /// Capacity of the queue between callers and the worker
    pub fn queue_capacity(&self) -> usize {
        self.buffer_size
            .saturating_mul(4)
            .clamp(MIN_QUEUE_CAPACITY, MAX_QUEUE_CAPACITY)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(LoggerError::config("buffered_database", message));
        if self.scheme().is_empty() {
            return fail("connection_url must look like scheme://...");
        }
        if self.database_name.trim().is_empty() {
            return fail("database_name must not be empty");
        }
        if self.collection_name.trim().is_empty() {
            return fail("collection_name must not be empty");
        }
        if self.buffer_size == 0 {
            return fail("buffer_size must be at least 1");
        }
        if self.buffer_size > MAX_BUFFER_SIZE {
            return fail(&format!("buffer_size must be at most {}", MAX_BUFFER_SIZE));
        }
        if self.flush_interval.is_zero() {
            return fail("flush_interval must be positive");
        }
        Ok(())
    }
}

/// Convert a record into the stored document shape.
///
/// Context fields are flattened next to the fixed keys without replacing
/// them; `expire_at` is the record timestamp plus `expire_after`.
pub fn to_document(record: &LogRecord, expire_after: Duration) -> Value {
    let mut doc = Map::new();
    doc.insert("timestamp".into(), Value::String(record.timestamp.to_rfc3339()));
    let expire_at = chrono::Duration::from_std(expire_after)
        .ok()
        .and_then(|ttl| record.timestamp.checked_add_signed(ttl))
        .unwrap_or(record.timestamp);
    doc.insert("expire_at".into(), Value::String(expire_at.to_rfc3339()));
    doc.insert("name".into(), Value::String(record.name.clone()));
    doc.insert("level".into(), Value::String(record.level.to_str().into()));
    doc.insert("levelno".into(), Value::from(record.level.as_number()));
    doc.insert("message".into(), Value::String(record.message.clone()));
    doc.insert("thread".into(), Value::String(record.thread_label().into()));
    if let Some(module) = &record.module_path {
        doc.insert("module".into(), Value::String(module.clone()));
    }
    if let Some(file) = &record.file {
        doc.insert("file".into(), Value::String(file.clone()));
    }
    if let Some(line) = record.line {
        doc.insert("line".into(), Value::from(line));
    }
    if let Some(exc) = &record.exc_text {
        doc.insert("exc_text".into(), Value::String(exc.clone()));
    }
    for (key, value) in record.context.fields() {
        doc.entry(key.clone()).or_insert_with(|| value.to_json_value());
    }
    Value::Object(doc)
}

/// Exponential backoff with up to 10% jitter; attempt 1 waits `base`
pub(crate) fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let factor = 2u32.saturating_pow(attempt - 1);
    let delay = base.saturating_mul(factor).min(max);
    let jitter_range = delay.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    delay + Duration::from_millis(jitter)
}

enum Command {
    Record(Value, LogLevel),
    Flush(Sender<()>),
}

pub struct BufferedDatabaseAppender {
    target: String,
    expire_after: Duration,
    sender: Option<Sender<Command>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl BufferedDatabaseAppender {
    /// Start the worker thread. `metrics` is shared with the owning handler
    /// so delivery outcomes show up next to its record counters.
    pub fn new(
        settings: DatabaseSettings,
        store: Box<dyn DocumentStore>,
        metrics: Arc<HandlerMetrics>,
    ) -> Result<Self> {
        settings.validate()?;
        let target = format!(
            "{}/{}/{}",
            store.describe(),
            settings.database_name,
            settings.collection_name
        );
        let (sender, receiver) = bounded(settings.queue_capacity());
        let expire_after = settings.expire_after;

        let worker = Worker {
            buffer: RecordBuffer::new(
                settings.buffer_size,
                settings.flush_level,
                settings.flush_interval,
            ),
            settings,
            store,
            metrics,
            target: target.clone(),
        };
        let handle = thread::Builder::new()
            .name("commandcenter-log-db".into())
            .spawn(move || worker.run(receiver))
            .map_err(|e| LoggerError::io_operation("spawning worker", target.clone(), e))?;

        Ok(Self {
            target,
            expire_after,
            sender: Some(sender),
            worker: Some(handle),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn sender(&self) -> Result<&Sender<Command>> {
        self.sender
            .as_ref()
            .ok_or_else(|| LoggerError::HandlerClosed(self.target.clone()))
    }
}

impl Appender for BufferedDatabaseAppender {
    fn append(&mut self, record: &LogRecord, _formatter: &dyn Formatter) -> Result<()> {
        let document = to_document(record, self.expire_after);
        match self.sender()?.try_send(Command::Record(document, record.level)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(LoggerError::writer(format!(
                "queue for {} is full",
                self.target
            ))),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::HandlerClosed(self.target.clone())),
        }
    }

    /// Deliver everything queued so far and wait for the worker to finish
    fn flush(&mut self) -> Result<()> {
        self.begin_flush()?.map_or(Ok(()), |wait| wait())
    }

    fn close(&mut self) -> Result<()> {
        self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        self.begin_shutdown(timeout)?.map_or(Ok(()), |wait| wait())
    }

    fn begin_flush(&mut self) -> Result<Option<PendingWait>> {
        let sender = self.sender()?.clone();
        let target = self.target.clone();
        Ok(Some(Box::new(move || {
            let timed_out = || LoggerError::writer(format!("flush of {} timed out", target));
            let (ack_tx, ack_rx) = bounded(1);
            sender
                .send_timeout(Command::Flush(ack_tx), DEFAULT_SHUTDOWN_TIMEOUT)
                .map_err(|_| timed_out())?;
            ack_rx
                .recv_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
                .map_err(|_| timed_out())
        })))
    }

    fn begin_shutdown(&mut self, timeout: Duration) -> Result<Option<PendingWait>> {
        // Closing the channel makes the worker drain and deliver what is left
        drop(self.sender.take());

        let Some(handle) = self.worker.take() else {
            return Ok(None);
        };
        let target = self.target.clone();
        Ok(Some(Box::new(move || join_within(handle, &target, timeout))))
    }

    fn name(&self) -> &str {
        "buffered_database"
    }
}

impl Drop for BufferedDatabaseAppender {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}

fn join_within(handle: thread::JoinHandle<()>, target: &str, timeout: Duration) -> Result<()> {
    let start = Instant::now();
    loop {
        if handle.is_finished() {
            return handle
                .join()
                .map_err(|_| LoggerError::other(format!("worker for {} panicked", target)));
        }
        if start.elapsed() >= timeout {
            eprintln!(
                "[LOGGER WARNING] Worker for {} did not finish within {:?}. \
                 Some logs may be lost.",
                target, timeout
            );
            return Err(LoggerError::writer(format!(
                "worker for {} did not finish within {:?}",
                target, timeout
            )));
        }
        thread::sleep(Duration::from_millis(10));
    }
}

struct Worker {
    settings: DatabaseSettings,
    store: Box<dyn DocumentStore>,
    buffer: RecordBuffer,
    metrics: Arc<HandlerMetrics>,
    target: String,
}

impl Worker {
    fn run(mut self, receiver: Receiver<Command>) {
        if let Err(e) = self
            .store
            .prepare(&self.settings.database_name, &self.settings.collection_name)
        {
            eprintln!("[LOGGER WARNING] Preparing {} failed: {}", self.target, e);
        }

        loop {
            let wait = self.buffer.time_until_due(Instant::now());
            match receiver.recv_timeout(wait) {
                Ok(Command::Record(document, level)) => {
                    if let Some(reason) = self.buffer.push(document, level) {
                        self.flush(reason);
                    } else if self.buffer.is_due(Instant::now()) {
                        self.flush(FlushReason::Interval);
                    }
                }
                Ok(Command::Flush(ack)) => {
                    self.flush(FlushReason::Requested);
                    let _ = ack.send(());
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.buffer.is_due(Instant::now()) {
                        self.flush(FlushReason::Interval);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush(FlushReason::Requested);
                    break;
                }
            }
        }
    }

    fn flush(&mut self, reason: FlushReason) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = self.buffer.take(Instant::now());
        self.metrics.record_flush();
        self.deliver(&batch, reason);
    }

    fn deliver(&mut self, batch: &[Value], reason: FlushReason) {
        let count = batch.len() as u64;
        let mut attempt = 0;
        loop {
            let result = self.store.insert_many(
                &self.settings.database_name,
                &self.settings.collection_name,
                batch,
            );
            match result {
                Ok(()) => {
                    self.metrics.record_delivered(count);
                    return;
                }
                Err(_) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    self.metrics.record_retry();
                    thread::sleep(retry_delay(
                        attempt,
                        self.settings.retry_backoff,
                        MAX_RETRY_BACKOFF,
                    ));
                }
                Err(e) => {
                    self.metrics.record_failed_batch(count);
                    eprintln!(
                        "[LOGGER ERROR] Discarding {} records for {} after {} attempts ({:?} flush): {}",
                        count,
                        self.target,
                        attempt + 1,
                        reason,
                        e
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Handler, LogContext};
    use crate::formatters::TextFormatter;
    use chrono::{DateTime, TimeZone, Utc};

    fn settings() -> DatabaseSettings {
        let mut settings = DatabaseSettings::new("memory://", "commandcenter", "logs");
        settings.buffer_size = 3;
        settings.flush_interval = Duration::from_secs(3600);
        settings.retry_backoff = Duration::from_millis(1);
        settings
    }

    fn appender(
        settings: DatabaseSettings,
    ) -> (BufferedDatabaseAppender, MemoryStore, Arc<HandlerMetrics>) {
        let store = MemoryStore::new();
        let metrics = Arc::new(HandlerMetrics::new());
        let appender =
            BufferedDatabaseAppender::new(settings, Box::new(store.clone()), Arc::clone(&metrics))
                .unwrap();
        (appender, store, metrics)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn info(message: &str) -> LogRecord {
        LogRecord::new("commandcenter.sources.traxx", LogLevel::Info, message)
    }

    #[test]
    fn test_defaults() {
        let settings = DatabaseSettings::new("file://./logs", "commandcenter", "logs");
        assert_eq!(settings.flush_interval, Duration::from_secs(10));
        assert_eq!(settings.flush_level, LogLevel::Error);
        assert_eq!(settings.buffer_size, 100);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.expire_after, Duration::from_secs(30 * 24 * 3600));
        assert_eq!(settings.scheme(), "file");
        assert_eq!(settings.queue_capacity(), 400);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = DatabaseSettings::new("localhost", "db", "c");
        assert!(settings.validate().is_err());
        settings.connection_url = "file://./logs".into();
        settings.buffer_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_buffer_size_upper_bound() {
        let mut settings = DatabaseSettings::new("file://./logs", "commandcenter", "logs");
        settings.buffer_size = MAX_BUFFER_SIZE;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.queue_capacity(), MAX_QUEUE_CAPACITY);

        settings.buffer_size = usize::MAX;
        let err = settings.validate().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("buffer_size must be at most"));

        let store = MemoryStore::new();
        let metrics = Arc::new(HandlerMetrics::new());
        assert!(BufferedDatabaseAppender::new(settings, Box::new(store), metrics).is_err());
    }

    #[test]
    fn test_document_shape() {
        let timestamp = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().unwrap();
        let record = LogRecord::new("commandcenter.auth.client", LogLevel::Warning, "slow bind")
            .with_timestamp(timestamp)
            .with_context(
                LogContext::new()
                    .with_field("correlation_id", "abc")
                    .with_field("level", "shadowed"),
            );

        let doc = to_document(&record, Duration::from_secs(86_400));
        assert_eq!(doc["name"], "commandcenter.auth.client");
        assert_eq!(doc["level"], "WARNING");
        assert_eq!(doc["levelno"], 30);
        assert_eq!(doc["correlation_id"], "abc");

        let expire_at = DateTime::parse_from_rfc3339(doc["expire_at"].as_str().unwrap()).unwrap();
        assert_eq!(expire_at, timestamp + chrono::Duration::days(1));
    }

    #[test]
    fn test_flush_on_buffer_size() {
        let (mut appender, store, metrics) = appender(settings());
        let formatter = TextFormatter::default();

        appender.append(&info("a"), &formatter).unwrap();
        appender.append(&info("b"), &formatter).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(store.batches().is_empty());

        appender.append(&info("c"), &formatter).unwrap();
        assert!(wait_for(|| store.batches().len() == 1));
        assert_eq!(store.batches()[0].documents.len(), 3);
        assert_eq!(metrics.delivered_records(), 3);
    }

    #[test]
    fn test_flush_on_severity() {
        let (mut appender, store, _) = appender(settings());
        let formatter = TextFormatter::default();

        appender.append(&info("context"), &formatter).unwrap();
        let error = LogRecord::new("commandcenter.sources.traxx", LogLevel::Error, "session expired");
        appender.append(&error, &formatter).unwrap();

        assert!(wait_for(|| store.batches().len() == 1));
        let docs = store.documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["message"], "session expired");
    }

    #[test]
    fn test_flush_on_interval() {
        let mut settings = settings();
        settings.flush_interval = Duration::from_millis(50);
        let (mut appender, store, _) = appender(settings);

        appender.append(&info("lonely"), &TextFormatter::default()).unwrap();
        assert!(wait_for(|| store.documents().len() == 1));
    }

    #[test]
    fn test_explicit_flush_and_close() {
        let (mut appender, store, _) = appender(settings());
        let formatter = TextFormatter::default();

        appender.append(&info("one"), &formatter).unwrap();
        appender.flush().unwrap();
        assert_eq!(store.documents().len(), 1);

        appender.append(&info("two"), &formatter).unwrap();
        appender.close().unwrap();
        assert_eq!(store.documents().len(), 2);

        assert!(appender.append(&info("late"), &formatter).is_err());
    }

    /// Store whose writes take `delay`, announcing when one has started
    struct SlowStore {
        delay: Duration,
        started: Sender<()>,
    }

    impl DocumentStore for SlowStore {
        fn insert_many(&mut self, _: &str, _: &str, _: &[Value]) -> Result<()> {
            let _ = self.started.try_send(());
            thread::sleep(self.delay);
            Ok(())
        }

        fn describe(&self) -> String {
            "slow://".into()
        }
    }

    fn slow_handler(delay: Duration) -> (Arc<Handler>, Receiver<()>) {
        let (started, started_rx) = bounded(16);
        let metrics = Arc::new(HandlerMetrics::new());
        let appender = BufferedDatabaseAppender::new(
            settings(),
            Box::new(SlowStore { delay, started }),
            Arc::clone(&metrics),
        )
        .unwrap();
        let handler = Handler::new("mongo", Box::new(appender), Arc::new(TextFormatter::default()))
            .with_metrics(metrics);
        (Arc::new(handler), started_rx)
    }

    #[test]
    fn test_slow_flush_does_not_block_other_records() {
        let delay = Duration::from_millis(600);
        let (handler, started) = slow_handler(delay);
        handler.handle(&info("queued"));

        let flusher = {
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler.flush())
        };
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let start = Instant::now();
        assert!(handler.handle(&info("while flushing")));
        assert_eq!(handler.kind(), "buffered_database");
        assert!(start.elapsed() < delay / 2, "blocked for {:?}", start.elapsed());

        flusher.join().unwrap().unwrap();
        handler.close().unwrap();
    }

    #[test]
    fn test_slow_close_does_not_hold_the_sink_lock() {
        let delay = Duration::from_millis(600);
        let (handler, started) = slow_handler(delay);
        handler.handle(&info("last words"));

        let closer = {
            let handler = Arc::clone(&handler);
            thread::spawn(move || handler.close())
        };
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let start = Instant::now();
        assert!(!handler.handle(&info("after close")));
        assert_eq!(handler.kind(), "buffered_database");
        handler.flush().unwrap();
        assert!(start.elapsed() < delay / 2, "blocked for {:?}", start.elapsed());

        closer.join().unwrap().unwrap();
        assert_eq!(handler.metrics().delivered_records(), 1);
    }

    #[test]
    fn test_retry_then_deliver() {
        let (mut appender, store, metrics) = appender(settings());
        store.fail_next(2);

        appender.append(&info("x"), &TextFormatter::default()).unwrap();
        appender.flush().unwrap();

        assert_eq!(store.attempts(), 3);
        assert_eq!(store.documents().len(), 1);
        assert_eq!(metrics.retry_count(), 2);
        assert_eq!(metrics.failed_batches(), 0);
    }

    #[test]
    fn test_retries_exhausted_discards_batch() {
        let (mut appender, store, metrics) = appender(settings());
        store.fail_next(10);

        appender.append(&info("x"), &TextFormatter::default()).unwrap();
        appender.append(&info("y"), &TextFormatter::default()).unwrap();
        appender.flush().unwrap();

        // first attempt plus max_retries
        assert_eq!(store.attempts(), 4);
        assert!(store.batches().is_empty());
        assert_eq!(metrics.failed_batches(), 1);
        assert_eq!(metrics.dropped_count(), 2);

        // the sink keeps working afterwards
        store.fail_next(0);
        appender.append(&info("z"), &TextFormatter::default()).unwrap();
        appender.flush().unwrap();
        assert_eq!(store.documents().len(), 1);
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);
        assert_eq!(retry_delay(0, base, max), Duration::ZERO);
        assert!(retry_delay(1, base, max) >= Duration::from_millis(100));
        assert!(retry_delay(2, base, max) >= Duration::from_millis(200));
        let capped = retry_delay(10, base, max);
        assert!(capped >= max && capped < max + Duration::from_millis(100));
    }
}
