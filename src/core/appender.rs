//! Appender trait for log output destinations

use super::{error::Result, formatter::Formatter, log_record::LogRecord};
use std::time::Duration;

/// The waiting half of a flush or shutdown, run after the handler released
/// the sink's lock
pub type PendingWait = Box<dyn FnOnce() -> Result<()> + Send>;

/// The sink half of a handler.
///
/// A [`Handler`](super::Handler) owns one appender behind a mutex and calls it
/// only for records that passed the handler's level and filters. Text sinks
/// render with the handler's formatter; structured sinks may ignore it.
pub trait Appender: Send {
    fn append(&mut self, record: &LogRecord, formatter: &dyn Formatter) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Release resources. Called once at shutdown; defaults to a flush.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }

    /// Close, giving background work at most `timeout` to drain.
    ///
    /// Sinks without background work ignore the timeout.
    fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        let _ = timeout;
        self.close()
    }

    /// Start a flush. Sinks that hand records to background work return
    /// the wait for that work instead of blocking, so the handler can run it
    /// without holding the lock other loggers append through.
    fn begin_flush(&mut self) -> Result<Option<PendingWait>> {
        self.flush().map(|()| None)
    }

    /// Start a shutdown, returning the bounded wait for background work if
    /// there is any. See [`begin_flush`](Self::begin_flush).
    fn begin_shutdown(&mut self, timeout: Duration) -> Result<Option<PendingWait>> {
        self.shutdown(timeout).map(|()| None)
    }

    fn name(&self) -> &str;
}
