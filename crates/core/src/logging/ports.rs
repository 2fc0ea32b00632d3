//! Port interfaces for the log store and audit trail

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmbridge_domain::{
    AuditEntry, AuditRecord, AuditStatus, LogEntry, LogFilter, LogLevel, NewLogEntry, Result,
};
use serde_json::Value;

/// Trait for persisting and querying structured log entries
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Insert an entry and return its id. The store assigns the timestamp.
    async fn insert(&self, entry: &NewLogEntry) -> Result<i64>;

    /// Page through entries matching `filter`, ordered by timestamp then id.
    async fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    /// Count entries matching the equality filters of `filter`.
    ///
    /// `limit`, `offset` and `order` are ignored.
    async fn count(&self, filter: &LogFilter) -> Result<u64>;

    /// All-time count per level. Levels without rows are omitted.
    async fn count_by_level(&self) -> Result<BTreeMap<LogLevel, u64>>;

    /// Count entries newer than `since`, optionally restricted to one level.
    async fn count_since(&self, since: DateTime<Utc>, level: Option<LogLevel>) -> Result<u64>;

    /// Delete every entry, or every entry of one level. Returns rows removed.
    async fn delete(&self, level: Option<LogLevel>) -> Result<u64>;

    /// Delete all but the `keep` most recent entries. Returns rows removed.
    async fn retain_latest(&self, keep: u32) -> Result<u64>;
}

/// Trait for the durable record of outbound CRM writes
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persist one audit record and return its id
    async fn record(&self, record: &AuditRecord) -> Result<i64>;

    /// Most recent audit entries, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>>;

    /// All audit entries tied to one local record, newest first
    async fn for_local_record(&self, local_record_id: &str) -> Result<Vec<AuditEntry>>;

    /// Count of audit entries per status
    async fn count_by_status(&self) -> Result<BTreeMap<AuditStatus, u64>>;
}

/// Process-level diagnostic channel.
///
/// Receives every error-level log and any entry the store failed to
/// persist. Implementations must not fail.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str, context: &Value);
}
