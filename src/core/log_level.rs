//! Severity level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Record severity. Numeric values follow the conventional 10-step scale so
/// documents that configure levels by number stay meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[derive(Default)]
pub enum LogLevel {
    Debug = 10,
    #[default]
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Numeric value (`levelno`)
    pub fn as_number(&self) -> u8 {
        *self as u8
    }

    /// Level for an exact numeric value
    pub fn from_number(value: u64) -> Option<Self> {
        LogLevel::ALL
            .into_iter()
            .find(|level| u64::from(level.as_number()) == value)
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Debug => Blue,
            LogLevel::Info => Green,
            LogLevel::Warning => Yellow,
            LogLevel::Error => Red,
            LogLevel::Critical => BrightRed,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<u64>() {
            return LogLevel::from_number(number)
                .ok_or_else(|| format!("Invalid log level: '{}'", s));
        }
        match trimmed.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.to_str().to_string()
    }
}

/// Serde adapter for `Option<LogLevel>` where `"NOTSET"` means "inherit".
pub(crate) mod optional {
    use super::LogLevel;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(level: &Option<LogLevel>, s: S) -> Result<S::Ok, S::Error> {
        match level {
            Some(level) => s.serialize_str(level.to_str()),
            None => s.serialize_str("NOTSET"),
        }
    }

    /// A level is written as a name (`"INFO"`) or a number (`20`)
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Name(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<LogLevel>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            None | Some(Raw::Number(0)) => Ok(None),
            Some(Raw::Number(n)) => LogLevel::from_number(n)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("Invalid log level: {}", n))),
            Some(Raw::Name(s)) if s.trim().eq_ignore_ascii_case("NOTSET") || s.trim() == "0" => {
                Ok(None)
            }
            Some(Raw::Name(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}
