//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Every record is either delivered or counted as dropped under load
//! - Request context stays bound to the thread that entered it
//! - Reconfiguring while other threads log is safe

use commandcenter_logging::appenders::{CapturedLines, MemoryAppender, MemoryStore};
use commandcenter_logging::config::{
    FilterConfig, FormatterConfig, HandlerConfig, LoggerConfig, LoggingConfig, Registry,
    RootConfig,
};
use commandcenter_logging::{LogLevel, Logging, RequestContext};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const RECORDS_PER_THREAD: usize = 500;

fn registry(store: &MemoryStore) -> (Registry, Arc<Mutex<Vec<CapturedLines>>>) {
    let captured: Arc<Mutex<Vec<CapturedLines>>> = Arc::default();
    let sink = Arc::clone(&captured);
    let mut registry = Registry::with_defaults();
    registry.register_handler("memory", move |_| {
        let (appender, lines) = MemoryAppender::new();
        sink.lock().push(lines);
        Ok(Box::new(appender))
    });
    let store = store.clone();
    registry.register_store("memory", move |_| Ok(Box::new(store.clone())));
    (registry, captured)
}

fn config() -> LoggingConfig {
    LoggingConfig::default()
        .with_formatter("who", FormatterConfig::text("%(username)s %(message)s"))
        .with_filter("username", FilterConfig::new("username"))
        .with_handler(
            "memory",
            HandlerConfig::new("memory")
                .with_formatter("who")
                .with_filter("username"),
        )
        .with_handler(
            "mongo",
            HandlerConfig::new("buffered_database")
                .with_param("connection_url", "memory://stress")
                .with_param("database_name", "commandcenter")
                .with_param("collection_name", "logs")
                .with_param("buffer_size", 50),
        )
        .with_logger(
            "commandcenter",
            LoggerConfig::new(Some(LogLevel::Info)).with_handler("mongo"),
        )
        .with_root(RootConfig::new(Some(LogLevel::Info)).with_handler("memory"))
}

#[test]
fn test_concurrent_logging_accounts_for_every_record() {
    let store = MemoryStore::new();
    let (registry, captured) = registry(&store);
    let logging = Arc::new(Logging::from_config(&config(), &registry).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logging = Arc::clone(&logging);
            thread::spawn(move || {
                let logger = logging.get_logger(&format!("commandcenter.sources.worker{}", t));
                for i in 0..RECORDS_PER_THREAD {
                    logger.info(format!("worker{} record {}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    let mongo = logging.handler("mongo").unwrap();
    assert!(logging.shutdown(Duration::from_secs(10)));

    let total = (THREADS * RECORDS_PER_THREAD) as u64;
    let delivered = store.documents().len() as u64;
    assert_eq!(delivered, mongo.metrics().delivered_records());
    assert_eq!(delivered + mongo.metrics().dropped_count(), total);

    let lines = captured.lock()[0].lock().len() as u64;
    assert_eq!(lines, total);
}

#[test]
fn test_request_context_is_per_thread() {
    let store = MemoryStore::new();
    let (registry, captured) = registry(&store);
    let logging = Arc::new(Logging::from_config(&config(), &registry).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logging = Arc::clone(&logging);
            thread::spawn(move || {
                let _guard = RequestContext::new()
                    .with_username(format!("user{}", t))
                    .enter();
                let logger = logging.get_logger("hyprxa.api");
                for i in 0..100 {
                    logger.info(format!("user{} {}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    let lines = captured.lock()[0].lock().clone();
    assert_eq!(lines.len(), THREADS * 100);
    for line in &lines {
        let (who, message) = line.split_once(' ').unwrap();
        assert!(
            message.starts_with(&format!("{} ", who)),
            "context leaked across threads: {}",
            line
        );
    }
}

#[test]
fn test_reconfigure_under_load() {
    let store = MemoryStore::new();
    let (registry, _) = registry(&store);
    let logging = Arc::new(Logging::from_config(&config(), &registry).unwrap());
    let running = Arc::new(AtomicBool::new(true));

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let logging = Arc::clone(&logging);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let logger = logging.get_logger("commandcenter.dialout");
                let mut sent = 0u64;
                while running.load(Ordering::Relaxed) {
                    logger.info(format!("writer{} {}", t, sent));
                    sent += 1;
                }
                sent
            })
        })
        .collect();

    for _ in 0..5 {
        logging.reconfigure(&config(), &registry).unwrap();
        thread::sleep(Duration::from_millis(10));
    }
    running.store(false, Ordering::Relaxed);

    let sent: u64 = writers
        .into_iter()
        .map(|w| w.join().expect("writer panicked"))
        .sum();
    assert!(sent > 0);
    assert!(logging.shutdown(Duration::from_secs(10)));
    assert!(store.documents().len() as u64 <= sent);
}
