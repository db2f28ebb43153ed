//! # Commandcenter Logging
//!
//! Declarative logging configuration for commandcenter and hyprxa services.
//!
//! A single document (`logging.toml`, or JSON) declares formatters, filters,
//! handlers and a hierarchy of named loggers. [`Logging`] validates the
//! document, builds every component through a [`Registry`](config::Registry)
//! and owns the result.
//!
//! ## Features
//!
//! - **Formatters**: `%(field)s` text patterns, JSON lines, logfmt
//! - **Context filters**: correlation id, client IP, username and host
//!   injected from the current [`RequestContext`]
//! - **Handlers**: console, file, TCP, null, and a buffered document-store
//!   sink flushing on size, severity or interval
//! - **Hierarchy**: dotted logger names inherit levels and propagate to root
//! - **Environment**: `COMMANDCENTER_LOGGING_CONFIG_PATH` selects the
//!   document, `${VAR:-default}` substitutes values, and
//!   `COMMANDCENTER_LOGGING_<SECTION>_<NAME>_<KEY>` overrides keys
//!
//! ## Example
//!
//! ```
//! use commandcenter_logging::config::{HandlerConfig, LoggingConfig, Registry, RootConfig};
//! use commandcenter_logging::{LogLevel, Logging, RequestContext};
//!
//! let config = LoggingConfig::default()
//!     .with_handler("discard", HandlerConfig::new("null"))
//!     .with_root(RootConfig::new(Some(LogLevel::Info)).with_handler("discard"));
//! let logging = Logging::from_config(&config, &Registry::with_defaults()).unwrap();
//!
//! let _request = RequestContext::new().with_username("operator").enter();
//! logging.get_logger("commandcenter.api").info("dialout started");
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod filters;
pub mod formatters;
pub mod macros;

#[cfg(feature = "tracing-bridge")]
pub mod bridge;

pub mod prelude {
    pub use crate::config::{
        FilterConfig, FormatterConfig, HandlerConfig, LoggerConfig, LoggingConfig, Registry,
        RootConfig,
    };
    pub use crate::core::{
        ContextGuard, FieldValue, LogContext, LogLevel, LogRecord, Logger, LoggerError, Logging,
        RequestContext, Result, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use core::{
    Appender, ContextGuard, FieldValue, Filter, Formatter, Handler, HandlerMetrics, LogContext,
    LogLevel, LogRecord, Logger, LoggerError, Logging, RequestContext, Result, TimestampFormat,
    DEFAULT_SHUTDOWN_TIMEOUT,
};

#[cfg(feature = "tracing-bridge")]
pub use bridge::LoggingLayer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
