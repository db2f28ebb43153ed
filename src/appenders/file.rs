//! File appender implementation

use crate::core::{Appender, Formatter, LogRecord, LoggerError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct FileAppender {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileAppender {
    /// Open `path` for appending, or truncate it first when `append` is false
    pub fn new(path: impl Into<PathBuf>, append: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(append)
            .write(true)
            .truncate(!append)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "opening log file",
                    format!("cannot open '{}'", path.display()),
                    e,
                )
            })?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Appender for FileAppender {
    fn append(&mut self, record: &LogRecord, formatter: &dyn Formatter) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File writer not initialized"))?;

        let mut output = formatter.format(record);
        output.push('\n');
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.writer = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use crate::formatters::TextFormatter;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_truncate_modes() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("commandcenter.log");
        let formatter = TextFormatter::default();

        let mut appender = FileAppender::new(&path, true)?;
        appender.append(&LogRecord::new("app", LogLevel::Info, "first"), &formatter)?;
        appender.close()?;

        let mut appender = FileAppender::new(&path, true)?;
        appender.append(&LogRecord::new("app", LogLevel::Info, "second"), &formatter)?;
        appender.close()?;
        assert_eq!(fs::read_to_string(&path)?, "INFO:app:first\nINFO:app:second\n");

        let mut appender = FileAppender::new(&path, false)?;
        appender.append(&LogRecord::new("app", LogLevel::Info, "third"), &formatter)?;
        appender.close()?;
        assert_eq!(fs::read_to_string(&path)?, "INFO:app:third\n");
        Ok(())
    }

    #[test]
    fn test_closed_appender_rejects() -> Result<()> {
        let dir = tempdir()?;
        let mut appender = FileAppender::new(dir.path().join("x.log"), true)?;
        appender.close()?;
        let result = appender.append(
            &LogRecord::new("app", LogLevel::Info, "late"),
            &TextFormatter::default(),
        );
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_missing_directory_is_error() {
        let err = FileAppender::new("/nonexistent-dir/for/sure/app.log", true)
            .err()
            .expect("open should fail");
        assert!(matches!(err, LoggerError::IoOperation { .. }));
    }
}
