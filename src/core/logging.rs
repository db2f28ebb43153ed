//! Resolution of a configuration into a live logger graph
//!
//! [`Logging`] owns everything a configuration produced: formatters,
//! filters, handlers and the logger hierarchy. It is the explicit
//! replacement for process-global logging state; applications keep one
//! value alive for as long as they log and drop (or shut down) it on exit.

use super::{
    error::{LoggerError, Result},
    handler::Handler,
    log_level::LogLevel,
    log_record::LogRecord,
    logger::Logger,
};
use crate::config::{
    load_default, validate_config, HandlerConfig, HandlerContext, LoggingConfig, Registry,
};
use crate::core::{Filter, Formatter, HandlerMetrics};
use crate::formatters::TextFormatter;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default shutdown timeout for logging cleanup (5 seconds)
///
/// Used when [`Logging`] is dropped without an explicit
/// [`shutdown`](Logging::shutdown).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Names that address the root logger
const ROOT_NAMES: [&str; 2] = ["", "root"];

pub(crate) fn is_root(name: &str) -> bool {
    ROOT_NAMES.contains(&name)
}

/// Dotted ancestors of `name`, nearest first: `a.b.c` yields `a.b`, `a`
pub(crate) fn ancestors(name: &str) -> impl Iterator<Item = &str> {
    name.rmatch_indices('.').map(move |(i, _)| &name[..i])
}

struct LoggerNode {
    level: Option<LogLevel>,
    handlers: Vec<Arc<Handler>>,
    propagate: bool,
}

/// One resolved configuration
pub(crate) struct Graph {
    loggers: HashMap<String, LoggerNode>,
    root: LoggerNode,
    handlers: BTreeMap<String, Arc<Handler>>,
}

impl Graph {
    /// Own level, else nearest configured ancestor's, else root's.
    /// `None` means every level is enabled.
    pub(crate) fn effective_level(&self, name: &str) -> Option<LogLevel> {
        if is_root(name) {
            return self.root.level;
        }
        std::iter::once(name)
            .chain(ancestors(name))
            .filter_map(|n| self.loggers.get(n))
            .find_map(|node| node.level)
            .or(self.root.level)
    }

    /// Hand a record to the handlers of its logger and, while `propagate`
    /// holds, to those of each configured ancestor and finally root.
    /// Returns the number of handlers consulted.
    pub(crate) fn dispatch(&self, record: &LogRecord) -> usize {
        let mut consulted = 0;
        if !is_root(&record.name) {
            let chain = std::iter::once(record.name.as_str()).chain(ancestors(&record.name));
            for node in chain.filter_map(|n| self.loggers.get(n)) {
                for handler in &node.handlers {
                    handler.handle(record);
                    consulted += 1;
                }
                if !node.propagate {
                    return consulted;
                }
            }
        }
        for handler in &self.root.handlers {
            handler.handle(record);
            consulted += 1;
        }
        consulted
    }

    fn is_configured_or_descendant(&self, name: &str) -> bool {
        std::iter::once(name)
            .chain(ancestors(name))
            .any(|n| self.loggers.contains_key(n))
    }

    fn close_handlers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut clean = true;
        for (name, handler) in &self.handlers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(e) = handler.close_within(remaining) {
                eprintln!("[LOGGER ERROR] Failed to close handler '{}': {}", name, e);
                clean = false;
            }
        }
        clean
    }
}

/// State shared by a [`Logging`] value and every [`Logger`] it handed out
pub(crate) struct Shared {
    graph: RwLock<Arc<Graph>>,
    issued: Mutex<HashSet<String>>,
    disabled: RwLock<HashSet<String>>,
    shut_down: AtomicBool,
}

impl Shared {
    pub(crate) fn graph(&self) -> Arc<Graph> {
        Arc::clone(&self.graph.read())
    }

    pub(crate) fn is_disabled(&self, name: &str) -> bool {
        self.shut_down.load(Ordering::Acquire) || self.disabled.read().contains(name)
    }

    /// Dispatch a record that already passed the logger's level check
    pub(crate) fn dispatch(&self, record: &LogRecord) {
        let graph = self.graph();
        if graph.dispatch(record) == 0 && record.level >= LogLevel::Warning {
            // Nothing is configured to receive it; keep warnings visible
            eprintln!("{}", record.message);
        }
    }
}

/// The live logging configuration.
///
/// # Example
///
/// ```
/// use commandcenter_logging::config::{HandlerConfig, LoggerConfig, LoggingConfig, Registry};
/// use commandcenter_logging::{LogLevel, Logging};
///
/// let config = LoggingConfig::default()
///     .with_handler("null", HandlerConfig::new("null"))
///     .with_logger("commandcenter", LoggerConfig::new(Some(LogLevel::Info)).with_handler("null"));
///
/// let logging = Logging::from_config(&config, &Registry::with_defaults()).unwrap();
/// let logger = logging.get_logger("commandcenter.auth.client");
/// assert!(logger.is_enabled_for(LogLevel::Info));
/// logger.info("bound to LDAP");
/// assert!(logging.shutdown(std::time::Duration::from_secs(1)));
/// ```
pub struct Logging {
    pub(crate) shared: Arc<Shared>,
}

impl Logging {
    /// Validate `config` and build every component it declares.
    ///
    /// Formatters and filters are built first, then handlers, then loggers.
    /// Any failure aborts: handlers already built are closed and no logger
    /// is created.
    pub fn from_config(config: &LoggingConfig, registry: &Registry) -> Result<Self> {
        let graph = build_graph(config, registry)?;
        Ok(Self {
            shared: Arc::new(Shared {
                graph: RwLock::new(Arc::new(graph)),
                issued: Mutex::new(HashSet::new()),
                disabled: RwLock::new(HashSet::new()),
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    /// Load the document from `COMMANDCENTER_LOGGING_CONFIG_PATH`,
    /// `./logging.toml` or the bundled default and resolve it with the
    /// built-in registry
    pub fn init() -> Result<Self> {
        let (config, _source) = load_default()?;
        Self::from_config(&config, &Registry::with_defaults())
    }

    /// Handle for the logger `name`; `""` and `"root"` name the root logger
    pub fn get_logger(&self, name: &str) -> Logger {
        self.shared.issued.lock().insert(name.to_string());
        Logger::new(name, Arc::clone(&self.shared))
    }

    pub fn root(&self) -> Logger {
        self.get_logger("root")
    }

    pub fn effective_level(&self, name: &str) -> Option<LogLevel> {
        self.shared.graph().effective_level(name)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<Handler>> {
        self.shared.graph().handlers.get(name).cloned()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.shared.graph().handlers.keys().cloned().collect()
    }

    /// Names of the loggers the current configuration declares
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.graph().loggers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.shared.is_disabled(name)
    }

    /// Replace the whole graph with one built from `config`.
    ///
    /// On error the current graph stays in place. On success the previous
    /// handlers are closed, and with `disable_existing_loggers` every logger
    /// handed out so far that the new document neither configures nor
    /// covers through a configured ancestor is disabled.
    pub fn reconfigure(&self, config: &LoggingConfig, registry: &Registry) -> Result<()> {
        if self.shared.shut_down.load(Ordering::Acquire) {
            return Err(LoggerError::HandlerClosed("logging is shut down".into()));
        }
        let graph = Arc::new(build_graph(config, registry)?);

        {
            let issued = self.shared.issued.lock();
            let mut disabled = self.shared.disabled.write();
            for name in issued.iter().filter(|n| !is_root(n)) {
                if graph.is_configured_or_descendant(name) {
                    disabled.remove(name);
                } else if config.disable_existing_loggers {
                    disabled.insert(name.clone());
                }
            }
        }

        let previous = std::mem::replace(&mut *self.shared.graph.write(), graph);
        previous.close_handlers(DEFAULT_SHUTDOWN_TIMEOUT);
        Ok(())
    }

    /// Flush every handler. All handlers are attempted; the first error is
    /// returned.
    pub fn flush(&self) -> Result<()> {
        let graph = self.shared.graph();
        let mut first_error = None;
        for (name, handler) in &graph.handlers {
            if let Err(e) = handler.flush() {
                eprintln!("[LOGGER ERROR] Failed to flush handler '{}': {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush and close every handler, waiting at most `timeout` for
    /// buffered sinks to drain. Returns `true` on a clean shutdown.
    /// Loggers stop emitting afterwards; calling it again is a no-op.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if self.shared.shut_down.swap(true, Ordering::AcqRel) {
            return true;
        }
        self.shared.graph().close_handlers(timeout)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for Logging {
    fn drop(&mut self) {
        if !self.shutdown(DEFAULT_SHUTDOWN_TIMEOUT) {
            eprintln!("[LOGGER WARNING] Logging did not shut down cleanly. Some logs may be lost.");
        }
    }
}

impl std::fmt::Debug for Logging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let graph = self.shared.graph();
        f.debug_struct("Logging")
            .field("handlers", &graph.handlers.values().collect::<Vec<_>>())
            .field("loggers", &self.logger_names())
            .field("root_level", &graph.root.level)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn build_graph(config: &LoggingConfig, registry: &Registry) -> Result<Graph> {
    validate_config(config).map_err(LoggerError::Validation)?;

    let mut formatters: HashMap<&str, Arc<dyn Formatter>> = HashMap::new();
    for (name, formatter) in &config.formatters {
        formatters.insert(name, registry.build_formatter(name, formatter)?);
    }
    let mut filters: HashMap<&str, Arc<dyn Filter>> = HashMap::new();
    for (name, filter) in &config.filters {
        filters.insert(name, registry.build_filter(name, filter)?);
    }

    let mut handlers: BTreeMap<String, Arc<Handler>> = BTreeMap::new();
    for (name, handler_config) in &config.handlers {
        match build_handler(name, handler_config, registry, &formatters, &filters) {
            Ok(handler) => {
                handlers.insert(name.clone(), Arc::new(handler));
            }
            Err(e) => {
                for built in handlers.values() {
                    let _ = built.close();
                }
                return Err(e);
            }
        }
    }

    let bind = |logger: &str, names: &[String]| -> Result<Vec<Arc<Handler>>> {
        names
            .iter()
            .map(|h| {
                handlers.get(h).cloned().ok_or_else(|| LoggerError::UnknownHandler {
                    logger: logger.to_string(),
                    handler: h.clone(),
                })
            })
            .collect()
    };

    let mut loggers = HashMap::new();
    for (name, logger) in &config.loggers {
        loggers.insert(
            name.clone(),
            LoggerNode {
                level: logger.level,
                handlers: bind(name, &logger.handlers)?,
                propagate: logger.propagate,
            },
        );
    }
    let root = LoggerNode {
        level: config.root.level,
        handlers: bind("root", &config.root.handlers)?,
        propagate: false,
    };

    Ok(Graph {
        loggers,
        root,
        handlers,
    })
}

fn build_handler(
    name: &str,
    config: &HandlerConfig,
    registry: &Registry,
    formatters: &HashMap<&str, Arc<dyn Formatter>>,
    filters: &HashMap<&str, Arc<dyn Filter>>,
) -> Result<Handler> {
    let formatter: Arc<dyn Formatter> = match &config.formatter {
        Some(f) => formatters
            .get(f.as_str())
            .cloned()
            .ok_or_else(|| LoggerError::UnknownFormatter {
                handler: name.to_string(),
                formatter: f.clone(),
            })?,
        None => Arc::new(TextFormatter::default()),
    };

    let metrics = Arc::new(HandlerMetrics::new());
    let context = HandlerContext {
        name,
        config,
        registry,
        metrics: Arc::clone(&metrics),
    };
    let appender = registry.build_appender(&context)?;

    let mut handler = Handler::new(name, appender, formatter)
        .with_level(config.level)
        .with_metrics(metrics);
    for filter in &config.filters {
        let built = filters
            .get(filter.as_str())
            .cloned()
            .ok_or_else(|| LoggerError::UnknownFilter {
                handler: name.to_string(),
                filter: filter.clone(),
            })?;
        handler = handler.with_filter(built);
    }
    Ok(handler)
}
