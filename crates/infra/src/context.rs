//! Bridge context - dependency injection container
//!
//! Wires the SQLite stores, the log service, both token strategies and the
//! sync client from one [`Config`].

use std::sync::Arc;

use crmbridge_common::time::{Clock, SystemClock};
use crmbridge_core::auth::ports::TokenProvider;
use crmbridge_core::logging::ports::{AuditRepository, DiagnosticSink, LogRepository};
use crmbridge_core::logging::LogService;
use crmbridge_core::options_ports::OptionStore;
use crmbridge_core::sync::ports::RecordSync;
use crmbridge_domain::{Config, Result};
use tracing::info;

use crate::database::{DbManager, SqliteAuditRepository, SqliteLogRepository, SqliteOptionStore};
use crate::integrations::crm::{CrmSyncClient, OAuthTokenManager, PasswordTokenManager};
use crate::observability::diagnostics::TracingDiagnosticSink;

/// Holds every service of a running bridge.
pub struct CrmContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub options: Arc<dyn OptionStore>,
    pub logs: Arc<LogService>,
    pub audits: Arc<dyn AuditRepository>,
    pub oauth: Arc<OAuthTokenManager>,
    pub tokens: Arc<PasswordTokenManager>,
    pub sync: Arc<dyn RecordSync>,
}

impl CrmContext {
    /// Open the database at `config.database.path` and build the services
    /// with the system clock.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Same as [`new`](Self::new) with an injected clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let options: Arc<dyn OptionStore> = Arc::new(SqliteOptionStore::new(Arc::clone(&db)));
        let log_repository: Arc<dyn LogRepository> =
            Arc::new(SqliteLogRepository::new(Arc::clone(&db), Arc::clone(&clock)));
        let audits: Arc<dyn AuditRepository> =
            Arc::new(SqliteAuditRepository::new(Arc::clone(&db), Arc::clone(&clock)));
        let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnosticSink);

        let logs = Arc::new(
            LogService::new(
                log_repository,
                Arc::clone(&audits),
                Arc::clone(&options),
                diagnostics,
                Arc::clone(&clock),
            )
            .with_defaults(config.logging.clone()),
        );

        let oauth = Arc::new(OAuthTokenManager::new(
            config.crm.clone(),
            Arc::clone(&options),
            Arc::clone(&logs),
            Arc::clone(&clock),
        )?);
        let alternate: Arc<dyn TokenProvider> = oauth.clone();
        let tokens = Arc::new(
            PasswordTokenManager::new(
                config.crm.clone(),
                Arc::clone(&options),
                Arc::clone(&logs),
                clock,
            )?
            .with_alternate(alternate),
        );

        let provider: Arc<dyn TokenProvider> = tokens.clone();
        let sync: Arc<dyn RecordSync> =
            Arc::new(CrmSyncClient::new(config.crm.clone(), provider, Arc::clone(&logs))?);

        info!(db_path = %db.path().display(), api_version = %config.crm.api_version, "CRM bridge context ready");

        Ok(Self { config, db, options, logs, audits, oauth, tokens, sync })
    }
}
