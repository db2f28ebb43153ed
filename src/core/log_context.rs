//! Structured fields attached to records, and the request-scoped context
//! that the context filters read from.
//!
//! This module provides:
//! - `LogContext`: per-record key-value fields (the record's "extras")
//! - `RequestContext`: correlation id, client IP and username of the request
//!   being served on the current thread
//! - `ContextGuard`: RAII guard that restores the previous request context

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => f.pad(s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => f.pad("null"),
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(FieldValue::Int)
            .unwrap_or_else(|_| FieldValue::String(i.to_string()))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Key-value fields carried by a record. Ordered so rendered output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to the context
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field to the context (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Get all fields
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Check if context has any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy fields from `other` that are not already present here
    pub fn merge_missing(&mut self, other: &LogContext) {
        for (key, value) in &other.fields {
            self.fields
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

thread_local! {
    static REQUEST_STACK: RefCell<Vec<RequestContext>> = const { RefCell::new(Vec::new()) };
}

/// Values describing the request being served on the current thread.
///
/// The web layer enters a context when a request starts; the
/// `correlation_id`, `ip_address` and `username` filters copy these values
/// onto every record emitted while the guard is alive.
///
/// # Example
///
/// ```
/// use commandcenter_logging::RequestContext;
///
/// let _guard = RequestContext::new()
///     .with_correlation_id("3f2a9c")
///     .with_ip_address("10.0.0.7")
///     .enter();
///
/// let current = RequestContext::current().unwrap();
/// assert_eq!(current.correlation_id.as_deref(), Some("3f2a9c"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: Option<String>,
    pub ip_address: Option<String>,
    pub username: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Make this the current context until the returned guard is dropped
    pub fn enter(self) -> ContextGuard {
        REQUEST_STACK.with(|stack| stack.borrow_mut().push(self));
        ContextGuard {
            _not_send: PhantomData,
        }
    }

    /// Run `f` with this context as the current one
    pub fn scope<R>(self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// The innermost context entered on this thread
    pub fn current() -> Option<RequestContext> {
        REQUEST_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Read the current context without cloning it
    pub fn with_current<R>(f: impl FnOnce(Option<&RequestContext>) -> R) -> R {
        REQUEST_STACK.with(|stack| f(stack.borrow().last()))
    }
}

/// RAII guard returned by [`RequestContext::enter`].
///
/// Dropping it restores whatever context was current before. The guard is
/// tied to the thread that created it.
pub struct ContextGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        REQUEST_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_creation() {
        let ctx = LogContext::new();
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_log_context_with_fields() {
        let ctx = LogContext::new()
            .with_field("command", "telalert.exe -g ops")
            .with_field("attempt", 2)
            .with_field("delegated", true);

        assert_eq!(ctx.fields().len(), 3);
        assert_eq!(ctx.get("attempt"), Some(&FieldValue::Int(2)));
    }

    #[test]
    fn test_log_context_format_is_ordered() {
        let ctx = LogContext::new()
            .with_field("url", "/piwebapi/streams")
            .with_field("status", 503);

        assert_eq!(ctx.format_fields(), "status=503 url=/piwebapi/streams");
    }

    #[test]
    fn test_merge_missing_keeps_existing_values() {
        let mut ctx = LogContext::new().with_field("host", "explicit");
        let other = LogContext::new()
            .with_field("host", "ignored")
            .with_field("username", "operator");

        ctx.merge_missing(&other);

        assert_eq!(ctx.get("host"), Some(&FieldValue::from("explicit")));
        assert_eq!(ctx.get("username"), Some(&FieldValue::from("operator")));
    }

    #[test]
    fn test_request_context_nesting() {
        assert!(RequestContext::current().is_none());

        let outer = RequestContext::new().with_correlation_id("outer").enter();
        {
            let _inner = RequestContext::new().with_correlation_id("inner").enter();
            assert_eq!(
                RequestContext::current().and_then(|c| c.correlation_id),
                Some("inner".to_string())
            );
        }
        assert_eq!(
            RequestContext::current().and_then(|c| c.correlation_id),
            Some("outer".to_string())
        );
        drop(outer);
        assert!(RequestContext::current().is_none());
    }

    #[test]
    fn test_request_context_is_thread_local() {
        let _guard = RequestContext::new().with_username("alice").enter();

        let seen = std::thread::spawn(RequestContext::current)
            .join()
            .expect("thread panicked");
        assert!(seen.is_none());
    }

    #[test]
    fn test_scope_returns_value() {
        let user = RequestContext::new()
            .with_username("bob")
            .scope(|| RequestContext::current().and_then(|c| c.username));
        assert_eq!(user.as_deref(), Some("bob"));
        assert!(RequestContext::current().is_none());
    }
}
