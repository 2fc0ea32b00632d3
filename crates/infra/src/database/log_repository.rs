//! SQLite implementation of the structured log store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crmbridge_common::time::Clock;
use crmbridge_core::logging::ports::LogRepository;
use crmbridge_domain::{LogEntry, LogFilter, LogLevel, NewLogEntry, Result as DomainResult};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Connection, Row};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// SQLite-backed log repository
pub struct SqliteLogRepository {
    db: Arc<DbManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteLogRepository {
    pub fn new(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl LogRepository for SqliteLogRepository {
    async fn insert(&self, entry: &NewLogEntry) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();
        let timestamp = self.clock.now().timestamp_millis();

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            insert_entry(&conn, &entry, timestamp).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn query(&self, filter: &LogFilter) -> DomainResult<Vec<LogEntry>> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();

        task::spawn_blocking(move || -> DomainResult<Vec<LogEntry>> {
            let conn = db.get_connection()?;
            query_entries(&conn, &filter).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count(&self, filter: &LogFilter) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let (clause, values) = where_clause(&filter);
            let sql = format!("SELECT COUNT(*) FROM crm_logs{clause}");
            let count: i64 = conn
                .query_row(&sql, params_from_iter(values), |row| row.get(0))
                .map_err(map_sql_error)?;
            Ok(count.max(0) as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_by_level(&self) -> DomainResult<BTreeMap<LogLevel, u64>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<BTreeMap<LogLevel, u64>> {
            let conn = db.get_connection()?;
            count_grouped_by_level(&conn).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_since(
        &self,
        since: DateTime<Utc>,
        level: Option<LogLevel>,
    ) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);
        let since = since.timestamp_millis();

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let count: i64 = match level {
                Some(level) => conn.query_row(
                    "SELECT COUNT(*) FROM crm_logs WHERE timestamp > ?1 AND level = ?2",
                    params![since, level.as_str()],
                    |row| row.get(0),
                ),
                None => conn.query_row(
                    "SELECT COUNT(*) FROM crm_logs WHERE timestamp > ?1",
                    params![since],
                    |row| row.get(0),
                ),
            }
            .map_err(map_sql_error)?;
            Ok(count.max(0) as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete(&self, level: Option<LogLevel>) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = match level {
                Some(level) => {
                    conn.execute("DELETE FROM crm_logs WHERE level = ?1", params![level.as_str()])
                }
                None => conn.execute("DELETE FROM crm_logs", params![]),
            }
            .map_err(map_sql_error)?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn retain_latest(&self, keep: u32) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute(
                    "DELETE FROM crm_logs WHERE id NOT IN (
                         SELECT id FROM crm_logs ORDER BY timestamp DESC, id DESC LIMIT ?1
                     )",
                    params![keep],
                )
                .map_err(map_sql_error)?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn insert_entry(conn: &Connection, entry: &NewLogEntry, timestamp: i64) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO crm_logs (timestamp, level, message, context, post_id, trigger_type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            timestamp,
            entry.level.as_str(),
            entry.message,
            entry.context.to_string(),
            entry.post_id,
            entry.trigger_type,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Equality filters joined with AND. Paging fields are not part of the clause.
fn where_clause(filter: &LogFilter) -> (String, Vec<SqlValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(level) = filter.level {
        conditions.push("level = ?");
        values.push(SqlValue::Text(level.as_str().to_string()));
    }
    if let Some(post_id) = filter.post_id {
        conditions.push("post_id = ?");
        values.push(SqlValue::Integer(post_id));
    }
    if let Some(trigger_type) = &filter.trigger_type {
        conditions.push("trigger_type = ?");
        values.push(SqlValue::Text(trigger_type.clone()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn query_entries(conn: &Connection, filter: &LogFilter) -> rusqlite::Result<Vec<LogEntry>> {
    let (clause, mut values) = where_clause(filter);
    let order = filter.order.as_sql();
    let sql = format!(
        "SELECT id, timestamp, level, message, context, post_id, trigger_type
         FROM crm_logs{clause}
         ORDER BY timestamp {order}, id {order}
         LIMIT ? OFFSET ?"
    );
    values.push(SqlValue::Integer(i64::from(filter.limit)));
    values.push(SqlValue::Integer(i64::from(filter.offset)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), map_log_row)?;
    rows.collect()
}

fn count_grouped_by_level(conn: &Connection) -> rusqlite::Result<BTreeMap<LogLevel, u64>> {
    let mut stmt = conn.prepare("SELECT level, COUNT(*) FROM crm_logs GROUP BY level")?;
    let rows = stmt.query_map(params![], |row| {
        let level = parse_level(row, 0)?;
        let count: i64 = row.get(1)?;
        Ok((level, count.max(0) as u64))
    })?;
    rows.collect()
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let timestamp_ms: i64 = row.get(1)?;
    let timestamp = DateTime::from_timestamp_millis(timestamp_ms)
        .ok_or_else(|| conversion_error(1, Type::Integer, "timestamp out of range"))?;

    let context_text: String = row.get(4)?;
    let context = serde_json::from_str(&context_text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(LogEntry {
        id: row.get(0)?,
        timestamp,
        level: parse_level(row, 2)?,
        message: row.get(3)?,
        context,
        post_id: row.get(5)?,
        trigger_type: row.get(6)?,
    })
}

fn parse_level(row: &Row<'_>, idx: usize) -> rusqlite::Result<LogLevel> {
    let text: String = row.get(idx)?;
    text.parse::<LogLevel>().map_err(|e| conversion_error(idx, Type::Text, &e))
}

fn conversion_error(idx: usize, ty: Type, message: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        ty,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message.to_string())),
    )
}
