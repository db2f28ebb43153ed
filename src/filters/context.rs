//! Filters that copy request-scoped values onto records
//!
//! Each filter reads the [`RequestContext`] entered on the current thread and
//! never rejects a record.

use crate::core::{Filter, LogRecord, RequestContext};

/// Adds `correlation_id`
///
/// `uuid_length` truncates the id; `default_value` is used outside a request.
#[derive(Debug, Clone, Default)]
pub struct CorrelationIdFilter {
    uuid_length: Option<usize>,
    default_value: Option<String>,
}

impl CorrelationIdFilter {
    pub fn new(uuid_length: Option<usize>, default_value: Option<String>) -> Self {
        Self {
            uuid_length,
            default_value,
        }
    }
}

impl Filter for CorrelationIdFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        let id = RequestContext::with_current(|ctx| {
            ctx.and_then(|c| c.correlation_id.as_deref()).map(|id| match self.uuid_length {
                Some(len) => id.chars().take(len).collect::<String>(),
                None => id.to_string(),
            })
        });
        if let Some(id) = id.or_else(|| self.default_value.clone()) {
            record.context.add_field("correlation_id", id);
        }
        true
    }

    fn kind(&self) -> &str {
        "correlation_id"
    }
}

/// Adds `ip_address` (the client address of the current request)
#[derive(Debug, Clone, Default)]
pub struct IpAddressFilter;

impl Filter for IpAddressFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        let ip = RequestContext::with_current(|ctx| ctx.and_then(|c| c.ip_address.clone()));
        if let Some(ip) = ip {
            record.context.add_field("ip_address", ip);
        }
        true
    }

    fn kind(&self) -> &str {
        "ip_address"
    }
}

/// Adds `username` (the authenticated user of the current request)
#[derive(Debug, Clone, Default)]
pub struct UsernameFilter;

impl Filter for UsernameFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        let username = RequestContext::with_current(|ctx| ctx.and_then(|c| c.username.clone()));
        if let Some(username) = username {
            record.context.add_field("username", username);
        }
        true
    }

    fn kind(&self) -> &str {
        "username"
    }
}

/// Adds `host`, the name of the machine emitting the record
#[derive(Debug, Clone)]
pub struct HostFilter {
    host: String,
}

impl HostFilter {
    /// Use `host` if given, otherwise the `HOSTNAME` / `COMPUTERNAME`
    /// environment, otherwise `localhost`
    pub fn new(host: Option<String>) -> Self {
        let host = host
            .or_else(|| std::env::var("HOSTNAME").ok())
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "localhost".to_string());
        Self { host }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Filter for HostFilter {
    fn filter(&self, record: &mut LogRecord) -> bool {
        record.context.add_field("host", self.host.as_str());
        true
    }

    fn kind(&self) -> &str {
        "host"
    }
}
