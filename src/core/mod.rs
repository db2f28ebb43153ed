//! Core logging types and traits

pub mod appender;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod handler;
pub mod log_context;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod logging;
pub mod metrics;
pub mod timestamp;

pub use appender::{Appender, PendingWait};
pub use error::{LoggerError, Result};
pub use filter::Filter;
pub use formatter::Formatter;
pub use handler::Handler;
pub use log_context::{ContextGuard, FieldValue, LogContext, RequestContext};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::Logger;
pub use logging::{Logging, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::HandlerMetrics;
pub use timestamp::TimestampFormat;
