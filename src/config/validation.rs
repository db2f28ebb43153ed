//! Configuration validation.
//!
//! Serde checks the shape of a document; this module checks that it hangs
//! together: every formatter and filter a handler names and every handler a
//! logger names is declared. All problems are reported, not just the first.

use super::schema::{LoggingConfig, ROOT_LOGGER, SUPPORTED_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported configuration version {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("handler '{handler}' references undeclared formatter '{formatter}'")]
    UndeclaredFormatter { handler: String, formatter: String },

    #[error("handler '{handler}' references undeclared filter '{filter}'")]
    UndeclaredFilter { handler: String, filter: String },

    #[error("logger '{logger}' references undeclared handler '{handler}'")]
    UndeclaredHandler { logger: String, handler: String },

    #[error("{kind} declared with an empty name")]
    EmptyName { kind: &'static str },

    #[error("handler '{handler}' has an empty class")]
    EmptyClass { handler: String },
}

pub fn validate_config(config: &LoggingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.version != SUPPORTED_VERSION {
        errors.push(ValidationError::UnsupportedVersion(config.version));
    }

    let empty = |name: &String| name.trim().is_empty();
    if config.formatters.keys().any(empty) {
        errors.push(ValidationError::EmptyName { kind: "formatter" });
    }
    if config.filters.keys().any(empty) {
        errors.push(ValidationError::EmptyName { kind: "filter" });
    }
    if config.handlers.keys().any(empty) {
        errors.push(ValidationError::EmptyName { kind: "handler" });
    }
    if config.loggers.keys().any(empty) {
        errors.push(ValidationError::EmptyName { kind: "logger" });
    }

    for (name, handler) in &config.handlers {
        if handler.class.trim().is_empty() {
            errors.push(ValidationError::EmptyClass {
                handler: name.clone(),
            });
        }
        if let Some(formatter) = &handler.formatter {
            if !config.formatters.contains_key(formatter) {
                errors.push(ValidationError::UndeclaredFormatter {
                    handler: name.clone(),
                    formatter: formatter.clone(),
                });
            }
        }
        for filter in &handler.filters {
            if !config.filters.contains_key(filter) {
                errors.push(ValidationError::UndeclaredFilter {
                    handler: name.clone(),
                    filter: filter.clone(),
                });
            }
        }
    }

    let loggers = config
        .loggers
        .iter()
        .map(|(name, logger)| (name.as_str(), &logger.handlers))
        .chain(std::iter::once((ROOT_LOGGER, &config.root.handlers)));
    for (logger, handlers) in loggers {
        for handler in handlers {
            if !config.handlers.contains_key(handler) {
                errors.push(ValidationError::UndeclaredHandler {
                    logger: logger.to_string(),
                    handler: handler.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
