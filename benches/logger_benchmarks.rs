//! Criterion benchmarks for commandcenter_logging

use commandcenter_logging::appenders::MemoryStore;
use commandcenter_logging::config::loader::BUNDLED_CONFIG;
use commandcenter_logging::config::{parse_config, ConfigFormat};
use commandcenter_logging::formatters::{JsonFormatter, LogfmtFormatter, TextFormatter};
use commandcenter_logging::prelude::*;
use commandcenter_logging::Formatter;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn null_config(root: LogLevel) -> LoggingConfig {
    LoggingConfig::default()
        .with_filter("correlation_id", FilterConfig::new("correlation_id"))
        .with_handler(
            "discard",
            HandlerConfig::new("null").with_filter("correlation_id"),
        )
        .with_logger(
            "commandcenter",
            LoggerConfig::new(Some(LogLevel::Info)).with_handler("discard"),
        )
        .with_root(RootConfig::new(Some(root)).with_handler("discard"))
}

// ============================================================================
// Configuration Benchmarks
// ============================================================================

fn bench_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");
    group.throughput(Throughput::Elements(1));
    let lookup = |_: &str| None;

    group.bench_function("parse_bundled", |b| {
        b.iter(|| parse_config(black_box(BUNDLED_CONFIG), ConfigFormat::Toml, &lookup).unwrap());
    });

    let config = null_config(LogLevel::Warning);
    let registry = Registry::with_defaults();
    group.bench_function("resolve", |b| {
        b.iter(|| Logging::from_config(black_box(&config), &registry).unwrap());
    });

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let logging = Logging::from_config(&null_config(LogLevel::Warning), &Registry::with_defaults())
        .unwrap();
    let deep = logging.get_logger("commandcenter.sources.pi_web.client");
    let outside = logging.get_logger("uvicorn.error");

    group.bench_function("propagated_info", |b| {
        b.iter(|| deep.info(black_box("polled 12 sensors")));
    });

    group.bench_function("disabled_level", |b| {
        b.iter(|| deep.debug(black_box("skipped")));
    });

    group.bench_function("root_only_warning", |b| {
        b.iter(|| outside.warning(black_box("slow subscriber")));
    });

    group.bench_function("with_request_context", |b| {
        let _guard = RequestContext::new()
            .with_correlation_id("6f1c2d3e4b5a69788796a5b4c3d2e1f0")
            .with_username("operator")
            .enter();
        b.iter(|| deep.info(black_box("dialout started")));
    });

    group.finish();
}

fn bench_buffered_database(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffered_database");
    group.throughput(Throughput::Elements(1));

    let store = MemoryStore::new();
    let mut registry = Registry::with_defaults();
    let shared = store.clone();
    registry.register_store("memory", move |_| Ok(Box::new(shared.clone())));
    let config = LoggingConfig::default()
        .with_handler(
            "mongo",
            HandlerConfig::new("buffered_database")
                .with_param("connection_url", "memory://bench")
                .with_param("database_name", "commandcenter")
                .with_param("collection_name", "logs")
                .with_param("buffer_size", 1000),
        )
        .with_root(RootConfig::new(Some(LogLevel::Info)).with_handler("mongo"));
    let logging = Logging::from_config(&config, &registry).unwrap();
    let logger = logging.get_logger("hyprxa");

    group.bench_function("enqueue", |b| {
        b.iter(|| logger.info(black_box("stream update")));
    });

    group.finish();
}

// ============================================================================
// Formatter Benchmarks
// ============================================================================

fn bench_formatters(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatters");
    group.throughput(Throughput::Elements(1));

    let record = LogRecord::new("commandcenter.auth", LogLevel::Info, "login accepted")
        .with_context(
            LogContext::new()
                .with_field("username", "operator")
                .with_field("ip_address", "10.1.2.3"),
        );

    let text = TextFormatter::new(
        "%(asctime)s %(levelname)-8s %(name)s %(username)s: %(message)s",
        None,
    )
    .unwrap();
    let json = JsonFormatter::new(None).unwrap();
    let logfmt = LogfmtFormatter::new(None).unwrap();

    group.bench_function("text", |b| b.iter(|| text.format(black_box(&record))));
    group.bench_function("json", |b| b.iter(|| json.format(black_box(&record))));
    group.bench_function("logfmt", |b| b.iter(|| logfmt.format(black_box(&record))));

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_configuration,
    bench_dispatch,
    bench_buffered_database,
    bench_formatters
);

criterion_main!(benches);
