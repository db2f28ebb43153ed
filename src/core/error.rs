//! Error types for the logging subsystem

use crate::config::validation::ValidationError;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML document could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML document could not be written
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Document failed semantic validation; every problem is listed
    #[error("Configuration validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// Handler names a formatter that is not declared
    #[error("Handler '{handler}' references undeclared formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    /// Handler names a filter that is not declared
    #[error("Handler '{handler}' references undeclared filter '{filter}'")]
    UnknownFilter { handler: String, filter: String },

    /// Logger names a handler that is not declared
    #[error("Logger '{logger}' references undeclared handler '{handler}'")]
    UnknownHandler { logger: String, handler: String },

    /// No constructor registered for a class tag
    #[error("No {kind} registered for class '{class}'")]
    UnknownClass { kind: String, class: String },

    /// `${VAR}` placeholder without a value or default
    #[error("Environment variable '{0}' is not set and has no default")]
    MissingEnvVar(String),

    /// Configuration file could not be located
    #[error("Logging configuration file not found: '{path}'")]
    ConfigNotFound { path: String },

    /// Remote sink could not deliver a batch
    #[error("Delivery to {target} failed: {message}")]
    DeliveryFailed { target: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// Channel send error
    #[error("Failed to send log record to background worker")]
    ChannelSendError,

    /// Handler already closed
    #[error("Handler '{0}' is closed")]
    HandlerClosed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn unknown_class(kind: impl Into<String>, class: impl Into<String>) -> Self {
        LoggerError::UnknownClass {
            kind: kind.into(),
            class: class.into(),
        }
    }

    /// Create a delivery error for a remote sink
    pub fn delivery(target: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::DeliveryFailed {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// True for errors raised while reading or resolving a configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LoggerError::TomlParse(_)
                | LoggerError::JsonError(_)
                | LoggerError::InvalidConfiguration { .. }
                | LoggerError::Validation(_)
                | LoggerError::UnknownFormatter { .. }
                | LoggerError::UnknownFilter { .. }
                | LoggerError::UnknownHandler { .. }
                | LoggerError::UnknownClass { .. }
                | LoggerError::MissingEnvVar(_)
                | LoggerError::ConfigNotFound { .. }
        )
    }
}
