//! Configuration schema definitions.
//!
//! Serde model of the logging document. Options a component class
//! understands but the schema does not name are kept in a flattened
//! `params` map, so a document survives a load/save cycle unchanged.

use crate::core::log_level::{self, LogLevel};
use crate::core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The only document version understood
pub const SUPPORTED_VERSION: u32 = 1;

/// Name used for the root logger in diagnostics and validation errors
pub const ROOT_LOGGER: &str = "root";

fn default_true() -> bool {
    true
}

fn default_root_level() -> Option<LogLevel> {
    Some(LogLevel::Warning)
}

/// Root of a logging document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub version: u32,

    /// Disable loggers handed out before this document was applied
    /// unless they are configured here (or descend from a configured logger)
    #[serde(default = "default_true")]
    pub disable_existing_loggers: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub formatters: BTreeMap<String, FormatterConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, FilterConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub handlers: BTreeMap<String, HandlerConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub loggers: BTreeMap<String, LoggerConfig>,

    #[serde(default)]
    pub root: RootConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_VERSION,
            disable_existing_loggers: true,
            formatters: BTreeMap::new(),
            filters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            loggers: BTreeMap::new(),
            root: RootConfig::default(),
        }
    }
}

impl LoggingConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn with_formatter(mut self, name: impl Into<String>, formatter: FormatterConfig) -> Self {
        self.formatters.insert(name.into(), formatter);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, filter: FilterConfig) -> Self {
        self.filters.insert(name.into(), filter);
        self
    }

    #[must_use]
    pub fn with_handler(mut self, name: impl Into<String>, handler: HandlerConfig) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    #[must_use]
    pub fn with_logger(mut self, name: impl Into<String>, logger: LoggerConfig) -> Self {
        self.loggers.insert(name.into(), logger);
        self
    }

    #[must_use]
    pub fn with_root(mut self, root: RootConfig) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    pub fn disable_existing_loggers(mut self, disable: bool) -> Self {
        self.disable_existing_loggers = disable;
        self
    }
}

/// A formatter declaration. Without `class` the `%`-pattern text formatter
/// is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    #[serde(default, alias = "()", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(default, alias = "fmt", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl FormatterConfig {
    pub const DEFAULT_CLASS: &'static str = "text";

    /// Text formatter with the given pattern
    pub fn text(format: impl Into<String>) -> Self {
        Self {
            format: Some(format.into()),
            ..Self::default()
        }
    }

    pub fn with_class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    pub fn class_name(&self) -> &str {
        self.class.as_deref().unwrap_or(Self::DEFAULT_CLASS)
    }
}

/// A filter declaration. Without `class` the logger-name filter is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, alias = "()", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl FilterConfig {
    pub const DEFAULT_CLASS: &'static str = "name";

    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            params: Map::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn class_name(&self) -> &str {
        self.class.as_deref().unwrap_or(Self::DEFAULT_CLASS)
    }
}

/// A handler declaration: sink class, threshold, formatter and filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(alias = "()")]
    pub class: String,

    #[serde(
        default,
        with = "log_level::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl HandlerConfig {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            level: None,
            formatter: None,
            filters: Vec::new(),
            params: Map::new(),
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A named logger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(
        default,
        with = "log_level::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<String>,

    #[serde(default = "default_true")]
    pub propagate: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: None,
            handlers: Vec::new(),
            propagate: true,
        }
    }
}

impl LoggerConfig {
    pub fn new(level: Option<LogLevel>) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handlers.push(handler.into());
        self
    }

    #[must_use]
    pub fn propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }
}

/// The root logger. `level = "NOTSET"` lets every record through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(default = "default_root_level", with = "log_level::optional")]
    pub level: Option<LogLevel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            level: default_root_level(),
            handlers: Vec::new(),
        }
    }
}

impl RootConfig {
    pub fn new(level: Option<LogLevel>) -> Self {
        Self {
            level,
            handlers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handlers.push(handler.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
version = 1
disable_existing_loggers = false

[formatters.brief]
format = "%(levelname)s:%(name)s:%(message)s"

[formatters.structured]
class = "json"

[filters.correlation_id]
"()" = "correlation_id"
uuid_length = 8
default_value = "-"

[handlers.console]
class = "console"
level = "INFO"
formatter = "brief"
filters = ["correlation_id"]
stream = "stdout"

[handlers.mongo]
class = "buffered_database"
level = "WARNING"
connection_url = "file://./logs"
database_name = "commandcenter"
collection_name = "logs"
flush_interval = 2.5
buffer_size = 50

[loggers."commandcenter.auth"]
level = "DEBUG"
handlers = ["mongo"]
propagate = false

[loggers.hyprxa]
handlers = ["console"]

[root]
level = "WARNING"
handlers = ["console"]
"#;

    #[test]
    fn test_parse_document() {
        let config = LoggingConfig::from_toml_str(DOCUMENT).unwrap();
        assert_eq!(config.version, 1);
        assert!(!config.disable_existing_loggers);

        assert_eq!(config.formatters["brief"].class_name(), "text");
        assert_eq!(config.formatters["structured"].class_name(), "json");

        let filter = &config.filters["correlation_id"];
        assert_eq!(filter.class_name(), "correlation_id");
        assert_eq!(filter.params["uuid_length"], 8);

        let console = &config.handlers["console"];
        assert_eq!(console.level, Some(LogLevel::Info));
        assert_eq!(console.filters, vec!["correlation_id"]);
        assert_eq!(console.params["stream"], "stdout");

        let mongo = &config.handlers["mongo"];
        assert_eq!(mongo.params["flush_interval"], 2.5);
        assert!(mongo.formatter.is_none());

        let auth = &config.loggers["commandcenter.auth"];
        assert_eq!(auth.level, Some(LogLevel::Debug));
        assert!(!auth.propagate);

        let hyprxa = &config.loggers["hyprxa"];
        assert_eq!(hyprxa.level, None);
        assert!(hyprxa.propagate);

        assert_eq!(config.root.level, Some(LogLevel::Warning));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = LoggingConfig::from_toml_str(DOCUMENT).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(LoggingConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_json_round_trip() {
        let config = LoggingConfig::from_toml_str(DOCUMENT).unwrap();
        let text = config.to_json_string().unwrap();
        assert_eq!(LoggingConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_json_str(r#"{"version": 1}"#).unwrap();
        assert!(config.disable_existing_loggers);
        assert_eq!(config.root.level, Some(LogLevel::Warning));
        assert!(config.handlers.is_empty());
    }

    #[test]
    fn test_notset_levels() {
        let config = LoggingConfig::from_json_str(
            r#"{"version": 1, "loggers": {"a": {"level": "NOTSET"}}, "root": {"level": "NOTSET"}}"#,
        )
        .unwrap();
        assert_eq!(config.loggers["a"].level, None);
        assert_eq!(config.root.level, None);
    }

    #[test]
    fn test_numeric_levels() {
        let config = LoggingConfig::from_toml_str(
            "version = 1\n[loggers.a]\nlevel = 20\n[loggers.b]\nlevel = 0\n[root]\nlevel = 40\n",
        )
        .unwrap();
        assert_eq!(config.loggers["a"].level, Some(LogLevel::Info));
        assert_eq!(config.loggers["b"].level, None);
        assert_eq!(config.root.level, Some(LogLevel::Error));

        assert!(LoggingConfig::from_json_str(r#"{"version": 1, "root": {"level": 35}}"#).is_err());
    }

    #[test]
    fn test_missing_version_is_error() {
        assert!(LoggingConfig::from_toml_str("[root]\nlevel = \"INFO\"").is_err());
    }

    #[test]
    fn test_bad_level_is_error() {
        let err = LoggingConfig::from_json_str(
            r#"{"version": 1, "root": {"level": "LOUD"}}"#,
        );
        assert!(err.is_err());
    }
}
