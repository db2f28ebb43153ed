//! `tracing` integration.
//!
//! [`LoggingLayer`] forwards `tracing` events into a [`Logging`] graph so
//! libraries instrumented with `tracing` end up in the configured handlers.
//! The event target becomes the logger name (`a::b` -> `a.b`), `TRACE`
//! maps to `DEBUG`, and event fields become context fields.

use crate::core::logging::Shared;
use crate::core::{FieldValue, LogContext, LogLevel, LogRecord, Logger, Logging};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

pub struct LoggingLayer {
    shared: Arc<Shared>,
}

impl Logging {
    /// A `tracing_subscriber` layer feeding this graph
    pub fn layer(&self) -> LoggingLayer {
        LoggingLayer {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Logger name for a `tracing` target
pub fn channel_name(target: &str) -> String {
    target.replace("::", ".")
}

pub fn level_from_tracing(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE | Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warning,
        Level::ERROR => LogLevel::Error,
    }
}

impl<S: Subscriber> Layer<S> for LoggingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = level_from_tracing(metadata.level());
        let logger = Logger::new(&channel_name(metadata.target()), Arc::clone(&self.shared));
        if !logger.is_enabled_for(level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(logger.name(), level, visitor.message.unwrap_or_default())
            .with_context(visitor.context);
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record = record.with_location(file, line, metadata.module_path().unwrap_or_default());
        }
        logger.log_record(record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    context: LogContext,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        self.context.add_field(field.name(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(&mut buf, "{:?}", value);
        if field.name() == "message" {
            self.message = Some(buf);
        } else {
            self.insert(field, FieldValue::String(buf));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, FieldValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::Float(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, FieldValue::String(value.to_string()));
    }
}
