//! Timestamp rendering for the `asctime` attribute
//!
//! A formatter's `datefmt` is either a strftime pattern or one of the
//! keywords `iso8601`, `rfc3339` and `unix_millis`. Without a `datefmt`
//! timestamps render as `2025-01-08 10:30:45,123`.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use super::error::{LoggerError, Result};

/// Standardized timestamp format options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2025-01-08 10:30:45,123`
    #[default]
    Classic,

    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    Iso8601,

    /// RFC 3339 format: `2025-01-08T10:30:45.123456+00:00`
    Rfc3339,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime format
    ///
    /// # Examples
    ///
    /// ```
    /// use commandcenter_logging::core::TimestampFormat;
    ///
    /// let format = TimestampFormat::from_datefmt(Some("%d/%b/%Y:%H:%M:%S")).unwrap();
    /// assert!(matches!(format, TimestampFormat::Custom(_)));
    /// ```
    Custom(String),
}

impl TimestampFormat {
    /// Resolve a formatter's `datefmt` option, rejecting malformed patterns
    pub fn from_datefmt(datefmt: Option<&str>) -> Result<Self> {
        let Some(pattern) = datefmt else {
            return Ok(TimestampFormat::Classic);
        };
        match pattern {
            "iso8601" => Ok(TimestampFormat::Iso8601),
            "rfc3339" => Ok(TimestampFormat::Rfc3339),
            "unix_millis" => Ok(TimestampFormat::UnixMillis),
            custom => {
                if StrftimeItems::new(custom).any(|item| matches!(item, Item::Error)) {
                    return Err(LoggerError::formatter(
                        "datefmt",
                        format!("invalid strftime pattern '{}'", custom),
                    ));
                }
                Ok(TimestampFormat::Custom(custom.to_string()))
            }
        }
    }

    /// Format a `DateTime<Utc>` according to this format
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Classic => datetime.format("%Y-%m-%d %H:%M:%S,%3f").to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }

    /// Check if this is a Unix-based numeric format
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, TimestampFormat::UnixMillis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_classic_format() {
        let result = TimestampFormat::Classic.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08 10:30:45,123");
    }

    #[test]
    fn test_iso8601_format() {
        let result = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123Z");
    }

    #[test]
    fn test_unix_millis_format() {
        let result = TimestampFormat::UnixMillis.format(&fixed_datetime());
        assert_eq!(result, "1736332245123");
        assert!(TimestampFormat::UnixMillis.is_numeric());
    }

    #[test]
    fn test_datefmt_keywords() {
        assert_eq!(
            TimestampFormat::from_datefmt(None).unwrap(),
            TimestampFormat::Classic
        );
        assert_eq!(
            TimestampFormat::from_datefmt(Some("rfc3339")).unwrap(),
            TimestampFormat::Rfc3339
        );
    }

    #[test]
    fn test_custom_apache_format() {
        let format = TimestampFormat::from_datefmt(Some("%d/%b/%Y:%H:%M:%S +0000")).unwrap();
        assert_eq!(format.format(&fixed_datetime()), "08/Jan/2025:10:30:45 +0000");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = TimestampFormat::from_datefmt(Some("%Y-%Q")).unwrap_err();
        assert!(matches!(err, LoggerError::FormatterError { .. }));
    }
}
