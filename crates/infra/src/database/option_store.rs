//! SQLite implementation of the persistent option store.

use std::sync::Arc;

use async_trait::async_trait;
use crmbridge_core::options_ports::OptionStore;
use crmbridge_domain::Result as DomainResult;
use rusqlite::{params, OptionalExtension};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};

/// `options(name, value)` table. Multi-key writes share one transaction.
pub struct SqliteOptionStore {
    db: Arc<DbManager>,
}

impl SqliteOptionStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OptionStore for SqliteOptionStore {
    async fn get(&self, name: &str) -> DomainResult<Option<String>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<String>> {
            let conn = db.get_connection()?;
            conn.query_row("SELECT value FROM options WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set(&self, name: &str, value: &str) -> DomainResult<()> {
        self.set_many(&[(name, value)]).await
    }

    async fn set_many(&self, values: &[(&str, &str)]) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let values: Vec<(String, String)> =
            values.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            for (name, value) in &values {
                tx.execute(
                    "INSERT INTO options (name, value) VALUES (?1, ?2)
                     ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                    params![name, value],
                )
                .map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_many(&self, names: &[&str]) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            for name in &names {
                tx.execute("DELETE FROM options WHERE name = ?1", params![name])
                    .map_err(map_sql_error)?;
            }
            tx.commit().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}
