//! Typed access to the free-form options of a component declaration

use crate::core::{LogLevel, LoggerError, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Borrowed view of a component's `params` with errors naming the component
pub struct Params<'a> {
    component: String,
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    /// `component` is used in error messages, e.g. `handler 'mongo'`
    pub fn new(component: impl Into<String>, map: &'a Map<String, Value>) -> Self {
        Self {
            component: component.into(),
            map,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn invalid(&self, key: &str, expected: &str, found: &Value) -> LoggerError {
        LoggerError::config(
            self.component.clone(),
            format!("option '{}' must be {}, found {}", key, expected, found),
        )
    }

    pub fn str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.invalid(key, "a string", other)),
        }
    }

    pub fn required_str(&self, key: &str) -> Result<&'a str> {
        self.str(key)?.ok_or_else(|| {
            LoggerError::config(self.component.clone(), format!("missing option '{}'", key))
        })
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(v @ Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(key, "a boolean", v)),
            },
            Some(other) => Err(self.invalid(key, "a boolean", other)),
        }
    }

    pub fn u64(&self, key: &str) -> Result<Option<u64>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer", v)),
            Some(v @ Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, "a non-negative integer", v)),
            Some(other) => Err(self.invalid(key, "a non-negative integer", other)),
        }
    }

    pub fn usize(&self, key: &str) -> Result<Option<usize>> {
        match self.u64(key)? {
            Some(n) => usize::try_from(n)
                .map(Some)
                .map_err(|_| self.invalid(key, "a platform-sized integer", &Value::from(n))),
            None => Ok(None),
        }
    }

    pub fn u32(&self, key: &str) -> Result<Option<u32>> {
        match self.u64(key)? {
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| self.invalid(key, "a 32-bit integer", &Value::from(n))),
            None => Ok(None),
        }
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a number", v)),
            Some(v @ Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, "a number", v)),
            Some(other) => Err(self.invalid(key, "a number", other)),
        }
    }

    /// Seconds as integer or float
    pub fn seconds(&self, key: &str) -> Result<Option<Duration>> {
        match self.f64(key)? {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|_| self.invalid(key, "a non-negative number of seconds", &Value::from(secs))),
            None => Ok(None),
        }
    }

    /// Level name (`"ERROR"`) or number (`40`)
    pub fn level(&self, key: &str) -> Result<Option<LogLevel>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v @ Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(key, "a level name", v)),
            Some(v @ Value::Number(n)) => n
                .as_u64()
                .and_then(LogLevel::from_number)
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a level number", v)),
            Some(other) => Err(self.invalid(key, "a level", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_typed_getters() {
        let m = map(json!({
            "connection_url": "file://./logs",
            "buffer_size": 50,
            "flush_interval": 2.5,
            "colors": "yes",
            "flush_level": "critical",
            "max_retries": "7",
        }));
        let params = Params::new("handler 'mongo'", &m);

        assert_eq!(params.required_str("connection_url").unwrap(), "file://./logs");
        assert_eq!(params.usize("buffer_size").unwrap(), Some(50));
        assert_eq!(params.seconds("flush_interval").unwrap(), Some(Duration::from_millis(2500)));
        assert_eq!(params.bool("colors").unwrap(), Some(true));
        assert_eq!(params.level("flush_level").unwrap(), Some(LogLevel::Critical));
        assert_eq!(params.u32("max_retries").unwrap(), Some(7));
        assert_eq!(params.str("absent").unwrap(), None);
    }

    #[test]
    fn test_errors_name_component() {
        let m = map(json!({"buffer_size": "lots", "stream": 3}));
        let params = Params::new("handler 'mongo'", &m);

        let err = params.usize("buffer_size").unwrap_err().to_string();
        assert!(err.contains("handler 'mongo'"), "{}", err);
        assert!(err.contains("buffer_size"), "{}", err);
        assert!(params.str("stream").is_err());
        assert!(params.required_str("database_name").is_err());
    }

    #[test]
    fn test_negative_seconds_rejected() {
        let m = map(json!({"flush_interval": -1}));
        assert!(Params::new("h", &m).seconds("flush_interval").is_err());
    }

    #[test]
    fn test_out_of_range_seconds_rejected() {
        let m = map(json!({"expire_after": 1e20, "flush_interval": 2.5}));
        let params = Params::new("handler 'mongo'", &m);
        let err = params.seconds("expire_after").unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(
            params.seconds("flush_interval").unwrap(),
            Some(Duration::from_millis(2500))
        );
    }
}
