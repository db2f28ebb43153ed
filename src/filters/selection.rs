//! Filters that select records instead of enriching them

use crate::core::{Filter, LogLevel, LogRecord};

/// Passes records whose channel is `name` or a dotted descendant of it.
/// An empty name passes everything.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    name: String,
}

impl NameFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Filter for NameFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        if self.name.is_empty() || record.name == self.name {
            return true;
        }
        record
            .name
            .strip_prefix(self.name.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }

    fn kind(&self) -> &str {
        "name"
    }
}

/// Passes records with `min <= level <= max`
#[derive(Debug, Clone)]
pub struct LevelFilter {
    min: Option<LogLevel>,
    max: Option<LogLevel>,
}

impl LevelFilter {
    pub fn new(min: Option<LogLevel>, max: Option<LogLevel>) -> Self {
        Self { min, max }
    }
}

impl Filter for LevelFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        self.min.map_or(true, |min| record.level >= min)
            && self.max.map_or(true, |max| record.level <= max)
    }

    fn kind(&self) -> &str {
        "level"
    }
}
