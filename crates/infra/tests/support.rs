#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use crmbridge_common::time::MockClock;
use crmbridge_core::auth::ports::TokenProvider;
use crmbridge_core::logging::ports::DiagnosticSink;
use crmbridge_core::logging::LogService;
use crmbridge_core::options_ports::OptionStore;
use crmbridge_domain::{CrmBridgeError, CrmConfig, LogLevel, Result, TokenState};
use crmbridge_infra::database::{
    DbManager, SqliteAuditRepository, SqliteLogRepository, SqliteOptionStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Diagnostic sink that remembers every write.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(LogLevel, String, Value)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(LogLevel, String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, level: LogLevel, message: &str, context: &Value) {
        self.events.lock().unwrap().push((level, message.to_string(), context.clone()));
    }
}

/// Temporary SQLite-backed log service with a manual clock.
///
/// Keeps the database directory alive for the duration of a test.
pub struct Harness {
    pub db: Arc<DbManager>,
    pub clock: Arc<MockClock>,
    pub options: Arc<SqliteOptionStore>,
    pub audits: Arc<SqliteAuditRepository>,
    pub sink: Arc<RecordingSink>,
    pub logs: Arc<LogService>,
    _temp_dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("bridge.db"), 4)
                .expect("db manager should be created"),
        );
        db.run_migrations().expect("schema migrations should apply");

        let clock = Arc::new(MockClock::new());
        let options = Arc::new(SqliteOptionStore::new(Arc::clone(&db)));
        let audits = Arc::new(SqliteAuditRepository::new(Arc::clone(&db), clock.clone()));
        let sink = Arc::new(RecordingSink::default());
        let logs = Arc::new(LogService::new(
            Arc::new(SqliteLogRepository::new(Arc::clone(&db), clock.clone())),
            audits.clone(),
            options.clone(),
            sink.clone(),
            clock.clone(),
        ));

        Self { db, clock, options, audits, sink, logs, _temp_dir: temp_dir }
    }

    pub fn option_store(&self) -> Arc<dyn OptionStore> {
        self.options.clone()
    }
}

/// CRM settings pointing at a mock server, with every credential filled in.
pub fn crm_config(login_url: &str) -> CrmConfig {
    CrmConfig {
        login_url: login_url.to_string(),
        api_version: "v58.0".to_string(),
        timeout_secs: 5,
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        username: "sync@example.com".to_string(),
        password: "hunter2".to_string(),
        security_token: "SECTOKEN".to_string(),
        redirect_uri: Some("https://site.example.com/oauth/callback".to_string()),
    }
}

/// Body of a successful token response.
pub fn token_body(instance_url: &str, expires_in: i64) -> Value {
    json!({
        "access_token": "T",
        "instance_url": instance_url,
        "token_type": "Bearer",
        "expires_in": expires_in,
    })
}

/// Token provider with a fixed answer.
pub struct StaticTokenProvider {
    pub token: Option<TokenState>,
    pub connection_ok: bool,
}

impl StaticTokenProvider {
    pub fn valid(instance_url: &str, access_token: &str) -> Self {
        Self {
            token: Some(TokenState {
                access_token: access_token.to_string(),
                instance_url: instance_url.to_string(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            }),
            connection_ok: true,
        }
    }

    pub fn invalid() -> Self {
        Self { token: None, connection_ok: false }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn is_token_valid(&self) -> bool {
        self.token.is_some()
    }

    async fn get_valid_token(&self) -> Result<TokenState> {
        self.token
            .clone()
            .ok_or_else(|| CrmBridgeError::Authentication("no token available".to_string()))
    }

    async fn test_connection(&self) -> bool {
        self.connection_ok
    }
}
