//! In-memory and discarding appenders

use crate::core::{Appender, Formatter, LogRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared view of the lines captured by a [`MemoryAppender`]
pub type CapturedLines = Arc<Mutex<Vec<String>>>;

/// Keeps every formatted line in memory. Useful in tests and for
/// embedding applications that render their own log view.
pub struct MemoryAppender {
    lines: CapturedLines,
}

impl MemoryAppender {
    /// Create the appender together with a handle to its captured lines
    pub fn new() -> (Self, CapturedLines) {
        let lines = CapturedLines::default();
        (
            Self {
                lines: Arc::clone(&lines),
            },
            lines,
        )
    }

    pub fn lines(&self) -> CapturedLines {
        Arc::clone(&self.lines)
    }
}

impl Appender for MemoryAppender {
    fn append(&mut self, record: &LogRecord, formatter: &dyn Formatter) -> Result<()> {
        self.lines.lock().push(formatter.format(record));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Accepts and discards every record
#[derive(Debug, Default)]
pub struct NullAppender;

impl Appender for NullAppender {
    fn append(&mut self, _record: &LogRecord, _formatter: &dyn Formatter) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
