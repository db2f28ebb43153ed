//! Document stores: where the buffered database sink delivers batches

use crate::core::{LoggerError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Destination of the buffered database sink.
///
/// A store is owned by the sink's worker thread; `insert_many` is called
/// with one flushed batch at a time and may be retried with the same batch.
pub trait DocumentStore: Send {
    fn insert_many(&mut self, database: &str, collection: &str, documents: &[Value]) -> Result<()>;

    /// One-time setup before the first batch (create collections, purge
    /// expired documents)
    fn prepare(&mut self, _database: &str, _collection: &str) -> Result<()> {
        Ok(())
    }

    /// Human readable destination used in diagnostics
    fn describe(&self) -> String;
}

/// Appends documents as JSON lines under `<root>/<database>/<collection>.jsonl`.
///
/// Selected by `file://` connection URLs.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build from a `file://` URL. `file://./logs` is relative to the
    /// working directory, `file:///var/log/cc` absolute.
    pub fn from_url(url: &str) -> Result<Self> {
        let path = url.strip_prefix("file://").ok_or_else(|| {
            LoggerError::config("buffered_database", format!("'{}' is not a file:// URL", url))
        })?;
        if path.is_empty() {
            return Err(LoggerError::config(
                "buffered_database",
                "file:// URL needs a directory",
            ));
        }
        Ok(Self::new(path))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_path(&self, database: &str, collection: &str) -> PathBuf {
        self.root.join(database).join(format!("{}.jsonl", collection))
    }

    /// Rewrite the collection without documents whose `expire_at` has passed.
    /// Returns the number of documents removed.
    pub fn purge_expired(&self, database: &str, collection: &str, now: DateTime<Utc>) -> Result<usize> {
        let path = self.collection_path(database, collection);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(LoggerError::io_operation(
                    "reading collection",
                    path.display().to_string(),
                    e,
                ))
            }
        };

        let mut kept = Vec::new();
        let mut removed = 0;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            if is_expired(line, now) {
                removed += 1;
            } else {
                kept.push(line);
            }
        }

        if removed > 0 {
            let mut rewritten = kept.join("\n");
            if !rewritten.is_empty() {
                rewritten.push('\n');
            }
            fs::write(&path, rewritten).map_err(|e| {
                LoggerError::io_operation("purging collection", path.display().to_string(), e)
            })?;
        }
        Ok(removed)
    }
}

fn is_expired(line: &str, now: DateTime<Utc>) -> bool {
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|doc| {
            doc.get("expire_at")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        })
        .is_some_and(|expire_at| expire_at <= now)
}

impl DocumentStore for JsonlStore {
    fn insert_many(&mut self, database: &str, collection: &str, documents: &[Value]) -> Result<()> {
        let path = self.collection_path(database, collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating collection", parent.display().to_string(), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening collection", path.display().to_string(), e)
            })?;
        let mut writer = BufWriter::new(file);
        for document in documents {
            serde_json::to_writer(&mut writer, document)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    fn prepare(&mut self, database: &str, collection: &str) -> Result<()> {
        self.purge_expired(database, collection, Utc::now())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

/// One delivered batch as seen by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBatch {
    pub database: String,
    pub collection: String,
    pub documents: Vec<Value>,
}

#[derive(Debug, Default)]
struct MemoryState {
    batches: Vec<StoredBatch>,
    attempts: usize,
    fail_next: usize,
}

/// Keeps delivered batches in memory. Clones share the same state, so a
/// test can keep one clone and hand another to the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `attempts` calls to `insert_many` fail
    pub fn fail_next(&self, attempts: usize) {
        self.state.lock().fail_next = attempts;
    }

    pub fn batches(&self) -> Vec<StoredBatch> {
        self.state.lock().batches.clone()
    }

    /// All stored documents in delivery order
    pub fn documents(&self) -> Vec<Value> {
        self.state
            .lock()
            .batches
            .iter()
            .flat_map(|b| b.documents.iter().cloned())
            .collect()
    }

    /// Number of `insert_many` calls, failed ones included
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }
}

impl DocumentStore for MemoryStore {
    fn insert_many(&mut self, database: &str, collection: &str, documents: &[Value]) -> Result<()> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(LoggerError::delivery(
                "memory://",
                "injected failure",
            ));
        }
        state.batches.push(StoredBatch {
            database: database.to_string(),
            collection: collection.to_string(),
            documents: documents.to_vec(),
        });
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_jsonl_insert_and_purge() -> Result<()> {
        let dir = tempdir()?;
        let mut store = JsonlStore::from_url(&format!("file://{}", dir.path().display()))?;
        let now = Utc::now();
        let past = (now - chrono::Duration::hours(1)).to_rfc3339();
        let future = (now + chrono::Duration::hours(1)).to_rfc3339();

        store.insert_many(
            "commandcenter",
            "logs",
            &[
                json!({"message": "old", "expire_at": past}),
                json!({"message": "fresh", "expire_at": future}),
            ],
        )?;

        let path = store.collection_path("commandcenter", "logs");
        assert_eq!(fs::read_to_string(&path)?.lines().count(), 2);

        store.prepare("commandcenter", "logs")?;
        let remaining = fs::read_to_string(&path)?;
        assert_eq!(remaining.lines().count(), 1);
        assert!(remaining.contains("fresh"));
        Ok(())
    }

    #[test]
    fn test_purge_missing_collection() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonlStore::new(dir.path());
        assert_eq!(store.purge_expired("db", "none", Utc::now())?, 0);
        Ok(())
    }

    #[test]
    fn test_bad_file_url() {
        assert!(JsonlStore::from_url("mongodb://localhost").is_err());
        assert!(JsonlStore::from_url("file://").is_err());
    }

    #[test]
    fn test_memory_store_failures() {
        let store = MemoryStore::new();
        let mut handle = store.clone();
        store.fail_next(1);

        assert!(handle.insert_many("db", "c", &[json!({})]).is_err());
        assert!(handle.insert_many("db", "c", &[json!({})]).is_ok());
        assert_eq!(store.attempts(), 2);
        assert_eq!(store.batches().len(), 1);
        assert_eq!(store.batches()[0].collection, "c");
    }
}
