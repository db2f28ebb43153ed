//! TCP appender for remote log collectors
//!
//! Ships newline-terminated formatted lines to a collector such as a
//! logstash or vector TCP input.

use crate::core::{Appender, Formatter, LogRecord, LoggerError, Result};
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TcpAppender {
    stream: Option<TcpStream>,
    address: String,
    reconnect_on_error: bool,
}

impl TcpAppender {
    /// Create an appender for `address` (`host:port`).
    ///
    /// The connection is opened on the first record so that a collector
    /// being down at startup does not fail configuration.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            stream: None,
            address: address.into(),
            reconnect_on_error: true,
        }
    }

    /// Enable or disable reconnection after a failed write
    ///
    /// Default: enabled
    #[must_use]
    pub fn with_reconnect(mut self, enable: bool) -> Self {
        self.reconnect_on_error = enable;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(&self.address).map_err(|e| {
            LoggerError::io_operation("connecting", format!("tcp {}", self.address), e)
        })?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> std::io::Result<()> {
        match self.stream {
            Some(ref mut stream) => stream.write_all(payload),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "stream not connected",
            )),
        }
    }
}

impl Appender for TcpAppender {
    fn append(&mut self, record: &LogRecord, formatter: &dyn Formatter) -> Result<()> {
        let mut message = formatter.format(record);
        message.push('\n');

        if self.stream.is_none() {
            self.connect()?;
        }

        match self.send(message.as_bytes()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stream = None;
                if !self.reconnect_on_error {
                    return Err(e.into());
                }
                // One reconnect and resend, then give up on this record
                match self.connect() {
                    Ok(()) => Ok(self.send(message.as_bytes())?),
                    Err(reconnect_err) => Err(LoggerError::writer(format!(
                        "Failed to send log and reconnect: {} (reconnect: {})",
                        e, reconnect_err
                    ))),
                }
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut stream) = self.stream {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tcp"
    }
}
