//! Filter trait

use super::log_record::LogRecord;

/// Inspects a record before it reaches a handler's sink.
///
/// A filter may add fields to the record (enrichment) and decides whether the
/// record continues: returning `false` drops it for this handler only.
pub trait Filter: Send + Sync {
    fn filter(&self, record: &mut LogRecord) -> bool;

    /// Class tag this filter was built from
    fn kind(&self) -> &str;
}
