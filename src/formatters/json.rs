//! JSON formatter: one object per record

use crate::core::{Formatter, LogRecord, Result, TimestampFormat};
use serde_json::{Map, Value};

/// Renders records as single-line JSON objects (JSONL)
///
/// Context fields are merged at the top level next to the fixed keys
/// `timestamp`, `level`, `name`, `message` and `thread`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    timestamp_format: TimestampFormat,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(datefmt: Option<&str>) -> Result<Self> {
        Ok(Self {
            timestamp_format: TimestampFormat::from_datefmt(datefmt)?,
            pretty: false,
        })
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Build the JSON object for a record
    pub fn to_value(&self, record: &LogRecord) -> Value {
        let mut object = Map::new();

        let timestamp = if self.timestamp_format.is_numeric() {
            Value::Number(record.timestamp.timestamp_millis().into())
        } else {
            Value::String(self.timestamp_format.format(&record.timestamp))
        };
        object.insert("timestamp".to_string(), timestamp);
        object.insert("level".to_string(), Value::String(record.level.to_str().to_string()));
        object.insert("name".to_string(), Value::String(record.name.clone()));
        object.insert("message".to_string(), Value::String(record.message.clone()));
        object.insert("thread".to_string(), Value::String(record.thread_label().to_string()));

        if let Some(ref file) = record.file {
            object.insert("file".to_string(), Value::String(file.clone()));
        }
        if let Some(line) = record.line {
            object.insert("line".to_string(), Value::Number(line.into()));
        }
        if let Some(ref module_path) = record.module_path {
            object.insert("module".to_string(), Value::String(module_path.clone()));
        }
        if let Some(ref exc) = record.exc_text {
            object.insert("exception".to_string(), Value::String(exc.clone()));
        }

        for (key, value) in record.context.fields() {
            object
                .entry(key.clone())
                .or_insert_with(|| value.to_json_value());
        }

        Value::Object(object)
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let value = self.to_value(record);
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        rendered.unwrap_or_default()
    }

    fn kind(&self) -> &str {
        "json"
    }
}
