//! Named logger handles

use super::{
    log_context::LogContext,
    log_level::LogLevel,
    log_record::LogRecord,
    logging::{is_root, Shared},
};
use std::sync::Arc;

/// A cheap, cloneable handle on one channel of a [`Logging`](super::Logging)
/// graph.
///
/// The handle stays valid across [`reconfigure`](super::Logging::reconfigure):
/// level and handlers are looked up at each call.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    shared: Arc<Shared>,
}

impl Logger {
    pub(crate) fn new(name: &str, shared: Arc<Shared>) -> Self {
        let name = if is_root(name) { "root" } else { name };
        Self {
            name: Arc::from(name),
            shared,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level in force for this logger; `None` lets every record through
    pub fn effective_level(&self) -> Option<LogLevel> {
        self.shared.graph().effective_level(&self.name)
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.is_disabled(&self.name)
    }

    /// True when a record at `level` would be dispatched
    #[inline]
    pub fn is_enabled_for(&self, level: LogLevel) -> bool {
        !self.is_disabled() && self.effective_level().map_or(true, |min| level >= min)
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if self.is_enabled_for(level) {
            self.shared.dispatch(&LogRecord::new(&*self.name, level, message));
        }
    }

    /// Log with the call site attached (used by the logging macros)
    pub fn log_at(
        &self,
        level: LogLevel,
        file: &str,
        line: u32,
        module_path: &str,
        message: impl AsRef<str>,
    ) {
        if self.is_enabled_for(level) {
            let record =
                LogRecord::new(&*self.name, level, message).with_location(file, line, module_path);
            self.shared.dispatch(&record);
        }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Critical, message);
    }

    /// Log with extra fields, available to formatters as `%(key)s`
    pub fn log_with_context(&self, level: LogLevel, message: impl AsRef<str>, context: LogContext) {
        if self.is_enabled_for(level) {
            let record = LogRecord::new(&*self.name, level, message).with_context(context);
            self.shared.dispatch(&record);
        }
    }

    /// Log at ERROR with `error` and its source chain as exception text
    pub fn exception(&self, message: impl AsRef<str>, error: &(dyn std::error::Error + 'static)) {
        if self.is_enabled_for(LogLevel::Error) {
            let record = LogRecord::new(&*self.name, LogLevel::Error, message).with_error(error);
            self.shared.dispatch(&record);
        }
    }

    /// Dispatch a prepared record. Its `name` is replaced with this
    /// logger's name.
    pub fn log_record(&self, mut record: LogRecord) {
        if self.is_enabled_for(record.level) {
            record.name = self.name.to_string();
            self.shared.dispatch(&record);
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("effective_level", &self.effective_level())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}
