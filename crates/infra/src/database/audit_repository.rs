//! SQLite implementation of the CRM write audit trail.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use crmbridge_common::time::Clock;
use crmbridge_core::logging::ports::AuditRepository;
use crmbridge_domain::{
    AuditEntry, AuditOperation, AuditRecord, AuditStatus, CrmBridgeError, Result as DomainResult,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};

const SELECT_COLUMNS: &str = "SELECT id, created_at, operation, object_type, remote_record_id,
        local_record_id, status, message, request_payload, response_payload, error_detail,
        execution_time
     FROM crm_sync_audit";

/// SQLite-backed audit repository
pub struct SqliteAuditRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteAuditRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn record(&self, record: &AuditRecord) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let record = record.clone();
        let created_at = self.clock.now().timestamp_millis();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            insert_record(&conn, &record, created_at)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent(&self, limit: u32) -> DomainResult<Vec<AuditEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<AuditEntry>> {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map(params![limit], map_audit_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn for_local_record(&self, local_record_id: &str) -> DomainResult<Vec<AuditEntry>> {
        let db = Arc::clone(&self.db);
        let local_record_id = local_record_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<AuditEntry>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "{SELECT_COLUMNS} WHERE local_record_id = ?1 ORDER BY created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![local_record_id], map_audit_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_by_status(&self) -> DomainResult<BTreeMap<AuditStatus, u64>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<BTreeMap<AuditStatus, u64>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare("SELECT status, COUNT(*) FROM crm_sync_audit GROUP BY status")
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![], |row| {
                    let status = parse_column::<AuditStatus>(row, 0)?;
                    let count: i64 = row.get(1)?;
                    Ok((status, count.max(0) as u64))
                })
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<BTreeMap<_, _>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn insert_record(conn: &Connection, record: &AuditRecord, created_at: i64) -> DomainResult<i64> {
    let request = encode(&record.request_payload)?;
    let response = record.response_payload.as_ref().map(encode).transpose()?;
    let error_detail = record.error_detail.as_ref().map(encode).transpose()?;

    conn.execute(
        "INSERT INTO crm_sync_audit (operation, object_type, remote_record_id, local_record_id,
                                     status, message, request_payload, response_payload,
                                     error_detail, execution_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.operation.as_str(),
            record.object_type,
            record.remote_record_id,
            record.local_record_id,
            record.status.as_str(),
            record.message,
            request,
            response,
            error_detail,
            record.execution_time.as_secs_f64(),
            created_at,
        ],
    )
    .map_err(map_sql_error)?;

    Ok(conn.last_insert_rowid())
}

fn encode(value: &Value) -> DomainResult<String> {
    serde_json::to_string(value)
        .map_err(|e| CrmBridgeError::Internal(format!("failed to encode audit payload: {e}")))
}

fn map_audit_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let created_ms: i64 = row.get(1)?;
    let created_at = DateTime::from_timestamp_millis(created_ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Integer,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, "created_at out of range")),
        )
    })?;
    let seconds: f64 = row.get(11)?;

    Ok(AuditEntry {
        id: row.get(0)?,
        created_at,
        record: AuditRecord {
            operation: parse_column::<AuditOperation>(row, 2)?,
            object_type: row.get(3)?,
            remote_record_id: row.get(4)?,
            local_record_id: row.get(5)?,
            status: parse_column::<AuditStatus>(row, 6)?,
            message: row.get(7)?,
            request_payload: decode(row, 8)?.unwrap_or(Value::Null),
            response_payload: decode(row, 9)?,
            error_detail: decode(row, 10)?,
            execution_time: Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or_default(),
        },
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

fn decode(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| serde_json::from_str(&t))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use crmbridge_common::time::MockClock;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (TempDir, SqliteAuditRepository, MockClock) {
        let dir = TempDir::new().unwrap();
        let db = DbManager::new(dir.path().join("audit.db"), 2).unwrap();
        db.run_migrations().unwrap();
        let clock = MockClock::new();
        let repo = SqliteAuditRepository::new(Arc::new(db), Arc::new(clock.clone()));
        (dir, repo, clock)
    }

    fn record(status: AuditStatus, local: &str) -> AuditRecord {
        AuditRecord {
            operation: AuditOperation::Create,
            object_type: "Contact".into(),
            remote_record_id: if status == AuditStatus::Success { "003xx".into() } else { String::new() },
            local_record_id: Some(local.into()),
            status,
            message: "done".into(),
            request_payload: json!({"LastName": "Doe"}),
            response_payload: (status == AuditStatus::Success).then(|| json!({"id": "003xx"})),
            error_detail: (status == AuditStatus::Error).then(|| json!({"status": 500})),
            execution_time: Duration::from_millis(250),
        }
    }

    #[tokio::test]
    async fn persists_null_response_for_failures() {
        let (_dir, repo, _clock) = setup();
        repo.record(&record(AuditStatus::Error, "42")).await.unwrap();

        let entries = repo.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        let stored = &entries[0].record;
        assert_eq!(stored.status, AuditStatus::Error);
        assert_eq!(stored.response_payload, None);
        assert_eq!(stored.remote_record_id, "");
        assert_eq!(stored.error_detail, Some(json!({"status": 500})));
        assert_eq!(stored.execution_time, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let (_dir, repo, clock) = setup();
        repo.record(&record(AuditStatus::Error, "1")).await.unwrap();
        clock.advance(ChronoDuration::seconds(5));
        repo.record(&record(AuditStatus::Success, "2")).await.unwrap();

        let entries = repo.recent(1).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.local_record_id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn groups_by_local_record_and_status() {
        let (_dir, repo, _clock) = setup();
        repo.record(&record(AuditStatus::Error, "7")).await.unwrap();
        repo.record(&record(AuditStatus::Success, "7")).await.unwrap();
        repo.record(&record(AuditStatus::Success, "8")).await.unwrap();

        assert_eq!(repo.for_local_record("7").await.unwrap().len(), 2);
        assert!(repo.for_local_record("9").await.unwrap().is_empty());

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts.get(&AuditStatus::Success), Some(&2));
        assert_eq!(counts.get(&AuditStatus::Error), Some(&1));
    }
}
