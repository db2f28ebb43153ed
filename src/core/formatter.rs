//! Formatter trait

use super::log_record::LogRecord;

/// Renders a record to a single line of text.
///
/// Formatters are immutable once built and shared between handlers.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;

    /// Class tag this formatter was built from
    fn kind(&self) -> &str;
}
