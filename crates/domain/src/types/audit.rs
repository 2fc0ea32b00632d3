//! Audit trail for outbound CRM writes

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Create,
    Update,
    Upsert,
    Delete,
    Query,
}

impl_domain_status_conversions!(AuditOperation {
    Create => "create",
    Update => "update",
    Upsert => "upsert",
    Delete => "delete",
    Query => "query",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Error,
}

impl_domain_status_conversions!(AuditStatus {
    Success => "success",
    Error => "error",
});

/// One outbound API call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation: AuditOperation,
    pub object_type: String,
    /// Id assigned by the CRM; empty when the call failed.
    pub remote_record_id: String,
    pub local_record_id: Option<String>,
    pub status: AuditStatus,
    pub message: String,
    pub request_payload: Value,
    /// Decoded response body, `None` when the call failed.
    pub response_payload: Option<Value>,
    /// Error details, `None` on success.
    pub error_detail: Option<Value>,
    pub execution_time: Duration,
}

/// A persisted [`AuditRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: AuditRecord,
}
