//! Constructor registry.
//!
//! Maps the `class` tag of each declaration to the function that builds it.
//! [`Registry::with_defaults`] knows every component shipped with the crate;
//! applications register their own under new tags (or replace built-ins).

use super::params::Params;
use super::schema::{FilterConfig, FormatterConfig, HandlerConfig};
use crate::appenders::{
    BufferedDatabaseAppender, ConsoleAppender, ConsoleStream, DatabaseSettings, DocumentStore,
    FileAppender, JsonlStore, NullAppender, TcpAppender,
};
use crate::core::{Appender, Filter, Formatter, HandlerMetrics, LoggerError, Result};
use crate::filters::{
    CorrelationIdFilter, HostFilter, IpAddressFilter, LevelFilter, NameFilter, UsernameFilter,
};
use crate::formatters::{JsonFormatter, LogfmtFormatter, TextFormatter, DEFAULT_PATTERN};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type FormatterFactory =
    Arc<dyn Fn(&str, &FormatterConfig) -> Result<Arc<dyn Formatter>> + Send + Sync>;
pub type FilterFactory = Arc<dyn Fn(&str, &FilterConfig) -> Result<Arc<dyn Filter>> + Send + Sync>;
pub type HandlerFactory =
    Arc<dyn Fn(&HandlerContext<'_>) -> Result<Box<dyn Appender>> + Send + Sync>;
pub type StoreFactory =
    Arc<dyn Fn(&DatabaseSettings) -> Result<Box<dyn DocumentStore>> + Send + Sync>;

/// What a handler constructor gets to work with
pub struct HandlerContext<'a> {
    pub name: &'a str,
    pub config: &'a HandlerConfig,
    pub registry: &'a Registry,
    /// Metrics the finished handler will report; sinks with background
    /// workers record into the same instance
    pub metrics: Arc<HandlerMetrics>,
}

impl HandlerContext<'_> {
    pub fn params(&self) -> Params<'_> {
        Params::new(format!("handler '{}'", self.name), &self.config.params)
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    formatters: HashMap<String, FormatterFactory>,
    filters: HashMap<String, FilterFactory>,
    handlers: HashMap<String, HandlerFactory>,
    stores: HashMap<String, StoreFactory>,
}

impl Registry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in formatter, filter, handler and store
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register_formatter("text", build_text_formatter)
            .register_formatter("json", build_json_formatter)
            .register_formatter("logfmt", build_logfmt_formatter)
            .register_filter("correlation_id", build_correlation_id_filter)
            .register_filter("ip_address", |_, _| Ok(Arc::new(IpAddressFilter)))
            .register_filter("username", |_, _| Ok(Arc::new(UsernameFilter)))
            .register_filter("host", build_host_filter)
            .register_filter("name", build_name_filter)
            .register_filter("level", build_level_filter)
            .register_handler("console", build_console)
            .register_handler("stream", build_console)
            .register_handler("file", build_file)
            .register_handler("tcp", build_tcp)
            .register_handler("null", |_| Ok(Box::new(NullAppender)))
            .register_handler("buffered_database", build_buffered_database)
            .register_handler("mongo", build_buffered_database)
            .register_store("file", |settings| {
                Ok(Box::new(JsonlStore::from_url(&settings.connection_url)?))
            });

        #[cfg(feature = "http")]
        {
            let http: fn(&DatabaseSettings) -> Result<Box<dyn DocumentStore>> = |settings| {
                Ok(Box::new(crate::appenders::HttpStore::new(
                    settings.connection_url.clone(),
                    settings.connect_timeout,
                )))
            };
            registry.register_store("http", http).register_store("https", http);
        }

        registry
    }

    pub fn register_formatter<F>(&mut self, class: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &FormatterConfig) -> Result<Arc<dyn Formatter>> + Send + Sync + 'static,
    {
        self.formatters.insert(class.into(), Arc::new(factory));
        self
    }

    pub fn register_filter<F>(&mut self, class: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&str, &FilterConfig) -> Result<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        self.filters.insert(class.into(), Arc::new(factory));
        self
    }

    pub fn register_handler<F>(&mut self, class: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&HandlerContext<'_>) -> Result<Box<dyn Appender>> + Send + Sync + 'static,
    {
        self.handlers.insert(class.into(), Arc::new(factory));
        self
    }

    /// Register a document store for connection URLs with this scheme
    pub fn register_store<F>(&mut self, scheme: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&DatabaseSettings) -> Result<Box<dyn DocumentStore>> + Send + Sync + 'static,
    {
        self.stores.insert(scheme.into(), Arc::new(factory));
        self
    }

    pub fn build_formatter(&self, name: &str, config: &FormatterConfig) -> Result<Arc<dyn Formatter>> {
        let class = config.class_name();
        let factory = self
            .formatters
            .get(class)
            .ok_or_else(|| LoggerError::unknown_class("formatter", class))?;
        factory(name, config)
    }

    pub fn build_filter(&self, name: &str, config: &FilterConfig) -> Result<Arc<dyn Filter>> {
        let class = config.class_name();
        let factory = self
            .filters
            .get(class)
            .ok_or_else(|| LoggerError::unknown_class("filter", class))?;
        factory(name, config)
    }

    pub fn build_appender(&self, context: &HandlerContext<'_>) -> Result<Box<dyn Appender>> {
        let class = context.config.class.as_str();
        let factory = self
            .handlers
            .get(class)
            .ok_or_else(|| LoggerError::unknown_class("handler", class))?;
        factory(context)
    }

    pub fn build_store(&self, settings: &DatabaseSettings) -> Result<Box<dyn DocumentStore>> {
        let scheme = settings.scheme();
        let factory = self
            .stores
            .get(scheme)
            .ok_or_else(|| LoggerError::unknown_class("document store", scheme))?;
        factory(settings)
    }

    pub fn formatter_classes(&self) -> Vec<&str> {
        sorted_keys(&self.formatters)
    }

    pub fn filter_classes(&self) -> Vec<&str> {
        sorted_keys(&self.filters)
    }

    pub fn handler_classes(&self) -> Vec<&str> {
        sorted_keys(&self.handlers)
    }

    pub fn store_schemes(&self) -> Vec<&str> {
        sorted_keys(&self.stores)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("formatters", &self.formatter_classes())
            .field("filters", &self.filter_classes())
            .field("handlers", &self.handler_classes())
            .field("stores", &self.store_schemes())
            .finish()
    }
}

fn formatter_params<'a>(name: &str, config: &'a FormatterConfig) -> Params<'a> {
    Params::new(format!("formatter '{}'", name), &config.params)
}

fn filter_params<'a>(name: &str, config: &'a FilterConfig) -> Params<'a> {
    Params::new(format!("filter '{}'", name), &config.params)
}

fn build_text_formatter(_name: &str, config: &FormatterConfig) -> Result<Arc<dyn Formatter>> {
    let pattern = config.format.as_deref().unwrap_or(DEFAULT_PATTERN);
    Ok(Arc::new(TextFormatter::new(pattern, config.datefmt.as_deref())?))
}

fn build_json_formatter(name: &str, config: &FormatterConfig) -> Result<Arc<dyn Formatter>> {
    let pretty = formatter_params(name, config).bool("pretty")?.unwrap_or(false);
    Ok(Arc::new(
        JsonFormatter::new(config.datefmt.as_deref())?.pretty(pretty),
    ))
}

fn build_logfmt_formatter(_name: &str, config: &FormatterConfig) -> Result<Arc<dyn Formatter>> {
    Ok(Arc::new(LogfmtFormatter::new(config.datefmt.as_deref())?))
}

fn build_correlation_id_filter(name: &str, config: &FilterConfig) -> Result<Arc<dyn Filter>> {
    let params = filter_params(name, config);
    Ok(Arc::new(CorrelationIdFilter::new(
        params.usize("uuid_length")?,
        params.str("default_value")?.map(String::from),
    )))
}

fn build_host_filter(name: &str, config: &FilterConfig) -> Result<Arc<dyn Filter>> {
    let params = filter_params(name, config);
    Ok(Arc::new(HostFilter::new(params.str("host")?.map(String::from))))
}

fn build_name_filter(name: &str, config: &FilterConfig) -> Result<Arc<dyn Filter>> {
    let params = filter_params(name, config);
    Ok(Arc::new(NameFilter::new(params.str("name")?.unwrap_or(""))))
}

fn build_level_filter(name: &str, config: &FilterConfig) -> Result<Arc<dyn Filter>> {
    let params = filter_params(name, config);
    let (min, max) = (params.level("min")?, params.level("max")?);
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(LoggerError::config(
                params.component(),
                format!("min ({}) is above max ({})", min, max),
            ));
        }
    }
    Ok(Arc::new(LevelFilter::new(min, max)))
}

fn build_console(context: &HandlerContext<'_>) -> Result<Box<dyn Appender>> {
    let params = context.params();
    let stream = match params.str("stream")? {
        Some(stream) => stream.parse::<ConsoleStream>()?,
        None => ConsoleStream::default(),
    };
    let colors = params.bool("colors")?.unwrap_or(false);
    Ok(Box::new(ConsoleAppender::new(stream).with_colors(colors)))
}

fn build_file(context: &HandlerContext<'_>) -> Result<Box<dyn Appender>> {
    let params = context.params();
    let filename = params.required_str("filename")?;
    let append = match params.str("mode")?.unwrap_or("a") {
        "a" => true,
        "w" => false,
        other => {
            return Err(LoggerError::config(
                params.component(),
                format!("mode must be 'a' or 'w', got '{}'", other),
            ))
        }
    };
    Ok(Box::new(FileAppender::new(filename, append)?))
}

fn build_tcp(context: &HandlerContext<'_>) -> Result<Box<dyn Appender>> {
    let params = context.params();
    let address = params.required_str("address")?;
    let reconnect = params.bool("reconnect")?.unwrap_or(true);
    Ok(Box::new(TcpAppender::new(address).with_reconnect(reconnect)))
}

/// Read `buffered_database` options, applying defaults for the absent ones
pub fn database_settings(params: &Params<'_>) -> Result<DatabaseSettings> {
    let mut settings = DatabaseSettings::new(
        params.required_str("connection_url")?,
        params.required_str("database_name")?,
        params.required_str("collection_name")?,
    );
    if let Some(interval) = params.seconds("flush_interval")? {
        settings.flush_interval = interval;
    }
    if let Some(level) = params.level("flush_level")? {
        settings.flush_level = level;
    }
    if let Some(size) = params.usize("buffer_size")? {
        settings.buffer_size = size;
    }
    if let Some(retries) = params.u32("max_retries")? {
        settings.max_retries = retries;
    }
    if let Some(expire_after) = params.seconds("expire_after")? {
        settings.expire_after = expire_after;
    }
    if let Some(backoff) = params.seconds("retry_backoff")? {
        settings.retry_backoff = backoff;
    }
    if let Some(timeout) = params.seconds("connect_timeout")? {
        settings.connect_timeout = timeout;
    }
    settings.validate()?;
    Ok(settings)
}

fn build_buffered_database(context: &HandlerContext<'_>) -> Result<Box<dyn Appender>> {
    let settings = database_settings(&context.params())?;
    let store = context.registry.build_store(&settings)?;
    Ok(Box::new(BufferedDatabaseAppender::new(
        settings,
        store,
        Arc::clone(&context.metrics),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::MemoryStore;
    use crate::core::{LogLevel, LogRecord};
    use serde_json::json;
    use std::time::Duration;

    fn context<'a>(name: &'a str, config: &'a HandlerConfig, registry: &'a Registry) -> HandlerContext<'a> {
        HandlerContext {
            name,
            config,
            registry,
            metrics: Arc::new(HandlerMetrics::new()),
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.formatter_classes(), vec!["json", "logfmt", "text"]);
        assert!(registry.handler_classes().contains(&"buffered_database"));
        assert!(registry.handler_classes().contains(&"mongo"));
        assert!(registry.filter_classes().contains(&"correlation_id"));
        assert!(registry.store_schemes().contains(&"file"));
    }

    #[test]
    fn test_unknown_class() {
        let registry = Registry::with_defaults();
        let config = HandlerConfig::new("syslog");
        let err = registry
            .build_appender(&context("sys", &config, &registry))
            .err()
            .expect("syslog is not registered");
        assert!(matches!(err, LoggerError::UnknownClass { ref class, .. } if class == "syslog"));

        let err = registry
            .build_formatter("f", &FormatterConfig::with_class("xml"))
            .err()
            .expect("xml is not registered");
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_custom_formatter() {
        struct Shout;
        impl Formatter for Shout {
            fn format(&self, record: &LogRecord) -> String {
                record.message.to_uppercase()
            }
            fn kind(&self) -> &str {
                "shout"
            }
        }

        let mut registry = Registry::empty();
        registry.register_formatter("shout", |_, _| Ok(Arc::new(Shout)));
        let formatter = registry
            .build_formatter("loud", &FormatterConfig::with_class("shout"))
            .unwrap();
        let record = LogRecord::new("a", LogLevel::Info, "hello");
        assert_eq!(formatter.format(&record), "HELLO");
    }

    #[test]
    fn test_database_settings_from_params() {
        let config = HandlerConfig::new("mongo")
            .with_param("connection_url", "file://./logs")
            .with_param("database_name", "commandcenter")
            .with_param("collection_name", "logs")
            .with_param("flush_interval", 2)
            .with_param("flush_level", "CRITICAL")
            .with_param("buffer_size", 10)
            .with_param("expire_after", 60);
        let registry = Registry::with_defaults();
        let settings = database_settings(&context("mongo", &config, &registry).params()).unwrap();
        assert_eq!(settings.flush_interval, Duration::from_secs(2));
        assert_eq!(settings.flush_level, LogLevel::Critical);
        assert_eq!(settings.buffer_size, 10);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.expire_after, Duration::from_secs(60));
    }

    #[test]
    fn test_database_settings_out_of_range() {
        let registry = Registry::with_defaults();
        let base = HandlerConfig::new("mongo")
            .with_param("connection_url", "file://./logs")
            .with_param("database_name", "commandcenter")
            .with_param("collection_name", "logs");

        let huge_buffer = base.clone().with_param("buffer_size", u64::MAX);
        let err = database_settings(&context("mongo", &huge_buffer, &registry).params()).unwrap_err();
        assert!(err.is_configuration_error());

        let huge_expiry = base.with_param("expire_after", 1e20);
        let err = database_settings(&context("mongo", &huge_expiry, &registry).params()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_store_selected_by_scheme() {
        let store = MemoryStore::new();
        let mut registry = Registry::with_defaults();
        let shared = store.clone();
        registry.register_store("memory", move |_| Ok(Box::new(shared.clone())));

        let config = HandlerConfig::new("buffered_database")
            .with_param("connection_url", "memory://test")
            .with_param("database_name", "commandcenter")
            .with_param("collection_name", "logs");
        let mut appender = registry
            .build_appender(&context("mongo", &config, &registry))
            .unwrap();
        appender
            .append(
                &LogRecord::new("a", LogLevel::Info, "stored"),
                &TextFormatter::default(),
            )
            .unwrap();
        appender.close().unwrap();
        assert_eq!(store.documents()[0]["message"], json!("stored"));

        let config = config.with_param("connection_url", "mongodb://localhost:27017");
        let err = registry
            .build_appender(&context("mongo", &config, &registry))
            .err()
            .expect("no mongodb store");
        assert!(matches!(err, LoggerError::UnknownClass { ref class, .. } if class == "mongodb"));
    }

    #[test]
    fn test_file_mode_validated() {
        let registry = Registry::with_defaults();
        let config = HandlerConfig::new("file")
            .with_param("filename", "x.log")
            .with_param("mode", "rw");
        assert!(registry
            .build_appender(&context("file", &config, &registry))
            .is_err());
    }

    #[test]
    fn test_level_filter_bounds() {
        let registry = Registry::with_defaults();
        let config = FilterConfig::new("level")
            .with_param("min", "ERROR")
            .with_param("max", "INFO");
        assert!(registry.build_filter("lvl", &config).is_err());
    }
}
