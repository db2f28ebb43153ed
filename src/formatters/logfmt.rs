//! Logfmt formatter (key=value pairs)

use crate::core::{FieldValue, Formatter, LogRecord, Result, TimestampFormat};

/// Renders `timestamp=... level=INFO name=... message="..." key=value`
#[derive(Debug, Clone, Default)]
pub struct LogfmtFormatter {
    timestamp_format: TimestampFormat,
}

impl LogfmtFormatter {
    pub fn new(datefmt: Option<&str>) -> Result<Self> {
        Ok(Self {
            timestamp_format: TimestampFormat::from_datefmt(datefmt)?,
        })
    }

    /// Escape a logfmt key (remove spaces and special chars)
    fn escape_key(key: &str) -> String {
        key.chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
            .collect()
    }

    /// Quote a value only if it contains spaces, quotes or `=`
    fn escape_value(value: &str) -> String {
        if value.is_empty() || value.contains([' ', '"', '=']) {
            Self::quote_value(value)
        } else {
            value.to_string()
        }
    }

    fn quote_value(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl Formatter for LogfmtFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut parts = vec![
            format!(
                "timestamp={}",
                Self::escape_value(&self.timestamp_format.format(&record.timestamp))
            ),
            format!("level={}", record.level.to_str()),
            format!("name={}", Self::escape_value(&record.name)),
            // Always quoted for safety
            format!("message={}", Self::quote_value(&record.message)),
        ];

        if let Some(line) = record.line {
            if let Some(file) = record.filename() {
                parts.push(format!("caller={}", Self::escape_value(&format!("{}:{}", file, line))));
            }
        }
        if let Some(ref exc) = record.exc_text {
            parts.push(format!("exception={}", Self::quote_value(exc)));
        }

        for (key, value) in record.context.fields() {
            let formatted = match value {
                FieldValue::String(s) => Self::escape_value(s),
                other => other.to_string(),
            };
            parts.push(format!("{}={}", Self::escape_key(key), formatted));
        }

        parts.join(" ")
    }

    fn kind(&self) -> &str {
        "logfmt"
    }
}
