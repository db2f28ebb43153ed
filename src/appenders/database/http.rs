//! HTTP document store: POSTs each batch as a JSON array

use super::store::DocumentStore;
use crate::core::{LoggerError, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// Delivers batches to `<base_url>/<database>/<collection>`.
///
/// Selected by `http://` and `https://` connection URLs; any 2xx response
/// counts as stored.
pub struct HttpStore {
    base_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    client: Option<Client>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout,
            request_timeout: connect_timeout.saturating_mul(6),
            client: None,
        }
    }

    pub fn endpoint(&self, database: &str, collection: &str) -> String {
        format!("{}/{}/{}", self.base_url, database, collection)
    }

    // Built on the worker thread at first use
    fn client(&mut self) -> Result<&Client> {
        if self.client.is_none() {
            let client = Client::builder()
                .connect_timeout(self.connect_timeout)
                .timeout(self.request_timeout)
                .build()
                .map_err(|e| LoggerError::delivery(&self.base_url, e.to_string()))?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| LoggerError::delivery(&self.base_url, "client unavailable"))
    }
}

impl DocumentStore for HttpStore {
    fn insert_many(&mut self, database: &str, collection: &str, documents: &[Value]) -> Result<()> {
        let endpoint = self.endpoint(database, collection);
        let response = self
            .client()?
            .post(&endpoint)
            .json(documents)
            .send()
            .map_err(|e| LoggerError::delivery(&endpoint, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(LoggerError::delivery(endpoint, format!("server answered {}", status)))
        }
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
