//! Port interfaces for sync operations

use async_trait::async_trait;
use crmbridge_domain::Result;
use serde_json::Value;

/// Trait for writing records to the remote CRM
#[async_trait]
pub trait RecordSync: Send + Sync {
    /// Update the record addressed by an external id, creating it when the
    /// CRM reports it does not exist.
    async fn upsert_record(
        &self,
        object_type: &str,
        external_id_field: &str,
        external_id_value: &str,
        data: Value,
    ) -> Result<Value>;

    /// Create a record, optionally stamping an external id into the payload.
    ///
    /// Every call is audited exactly once whatever the outcome.
    async fn create_record(
        &self,
        object_type: &str,
        data: Value,
        external_id: Option<(&str, &str)>,
    ) -> Result<Value>;

    /// Health probe for admin surfaces. Never fails.
    async fn test_connection(&self) -> bool;
}
