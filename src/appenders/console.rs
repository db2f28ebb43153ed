//! Console appender implementation

use crate::core::{Appender, Formatter, LogRecord, LoggerError, Result};
use std::io::Write;
use std::str::FromStr;

#[cfg(feature = "console")]
use colored::Colorize;

/// Which standard stream a console handler writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStream {
    Stdout,
    #[default]
    Stderr,
}

impl FromStr for ConsoleStream {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        // `ext://sys.stdout` is how stream targets are spelled in older documents
        match s.trim().trim_start_matches("ext://sys.") {
            "stdout" => Ok(ConsoleStream::Stdout),
            "stderr" => Ok(ConsoleStream::Stderr),
            other => Err(LoggerError::config(
                "console",
                format!("stream must be 'stdout' or 'stderr', got '{}'", other),
            )),
        }
    }
}

pub struct ConsoleAppender {
    stream: ConsoleStream,
    use_colors: bool,
}

impl ConsoleAppender {
    pub fn new(stream: ConsoleStream) -> Self {
        Self {
            stream,
            use_colors: false,
        }
    }

    /// Color each line by level (only with the `console` feature)
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn stream(&self) -> ConsoleStream {
        self.stream
    }

    fn render(&self, record: &LogRecord, formatter: &dyn Formatter) -> String {
        let line = formatter.format(record);
        #[cfg(feature = "console")]
        if self.use_colors {
            return line.color(record.level.color_code()).to_string();
        }
        line
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new(ConsoleStream::default())
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, record: &LogRecord, formatter: &dyn Formatter) -> Result<()> {
        let output = self.render(record, formatter);
        match self.stream {
            ConsoleStream::Stdout => writeln!(std::io::stdout().lock(), "{}", output)?,
            ConsoleStream::Stderr => writeln!(std::io::stderr().lock(), "{}", output)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().flush()?,
            ConsoleStream::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
