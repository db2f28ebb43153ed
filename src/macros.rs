//! Logging macros for ergonomic log message formatting.
//!
//! These macros format like `format!` and attach the call site (file, line,
//! module) so `%(filename)s`, `%(lineno)d` and `%(module)s` render. The
//! message is only formatted when the logger is enabled for the level.
//!
//! # Examples
//!
//! ```
//! use commandcenter_logging::config::{LoggingConfig, Registry};
//! use commandcenter_logging::{info, Logging};
//!
//! let logging = Logging::from_config(&LoggingConfig::default(), &Registry::with_defaults()).unwrap();
//! let logger = logging.get_logger("commandcenter.sources.traxx");
//!
//! let sensors = 12;
//! info!(logger, "Polled {} sensors", sensors);
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use commandcenter_logging::config::{LoggingConfig, Registry};
/// # use commandcenter_logging::{LogLevel, Logging};
/// # let logging = Logging::from_config(&LoggingConfig::default(), &Registry::with_defaults()).unwrap();
/// # let logger = logging.get_logger("hyprxa");
/// use commandcenter_logging::log;
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger.log_at(level, file!(), line!(), module_path!(), format!($($arg)+));
        }
    }};
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}
