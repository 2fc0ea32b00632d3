//! Log store service - level gating, retention, stats and export

use std::sync::Arc;

use chrono::Duration;
use crmbridge_common::time::Clock;
use crmbridge_domain::constants::options;
use crmbridge_domain::{
    AuditRecord, ExportFormat, LogEntry, LogFilter, LogLevel, LogStats, LoggingConfig,
    NewLogEntry, Result,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::export;
use super::ports::{AuditRepository, DiagnosticSink, LogRepository};
use crate::options_ports::OptionStore;

const TRIGGER_SYNC: &str = "sync";
const TRIGGER_API_CALL: &str = "api_call";
const TRIGGER_AUTH: &str = "auth";

/// Structured, durable, queryable log of CRM activity.
///
/// `log` never fails: an entry the repository rejects is written to the
/// diagnostic sink instead. Per-level flags and the retention cap are read
/// from the option store on each call and fall back to [`LoggingConfig`].
pub struct LogService {
    logs: Arc<dyn LogRepository>,
    audits: Arc<dyn AuditRepository>,
    options: Arc<dyn OptionStore>,
    diagnostics: Arc<dyn DiagnosticSink>,
    clock: Arc<dyn Clock>,
    defaults: LoggingConfig,
}

impl LogService {
    pub fn new(
        logs: Arc<dyn LogRepository>,
        audits: Arc<dyn AuditRepository>,
        options: Arc<dyn OptionStore>,
        diagnostics: Arc<dyn DiagnosticSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { logs, audits, options, diagnostics, clock, defaults: LoggingConfig::default() }
    }

    /// Override the level flags and retention cap used when no option is set.
    pub fn with_defaults(mut self, defaults: LoggingConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Record one entry.
    pub async fn log(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<Value>,
        post_id: Option<i64>,
        trigger_type: Option<&str>,
    ) {
        if !self.is_level_enabled(level).await {
            return;
        }

        let entry = NewLogEntry::new(level, message, context)
            .with_post_id(post_id)
            .with_trigger_type(trigger_type.map(str::to_string));

        match self.logs.insert(&entry).await {
            Ok(id) => {
                debug!(id, level = %level, "log entry stored");
                self.enforce_retention().await;
                if level == LogLevel::Error {
                    self.diagnostics.emit(level, &entry.message, &entry.context);
                }
            }
            Err(err) => {
                warn!(error = %err, "log entry could not be persisted");
                self.diagnostics.emit(level, &entry.message, &entry.context);
            }
        }
    }

    pub async fn error(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Error, message, context, None, None).await;
    }

    pub async fn warning(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Warning, message, context, None, None).await;
    }

    pub async fn info(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Info, message, context, None, None).await;
    }

    pub async fn debug(&self, message: &str, context: Option<Value>) {
        self.log(LogLevel::Debug, message, context, None, None).await;
    }

    /// Outcome of a post sync. Failures log at error level.
    pub async fn log_sync_attempt(
        &self,
        post_id: i64,
        operation: &str,
        success: bool,
        details: Option<Value>,
    ) {
        let (level, outcome) =
            if success { (LogLevel::Info, "succeeded") } else { (LogLevel::Error, "failed") };
        let message = format!("Sync {operation} {outcome} for post {post_id}");

        self.log(level, &message, details, Some(post_id), Some(TRIGGER_SYNC)).await;
    }

    /// Outcome of one HTTP call to the CRM.
    pub async fn log_api_call(
        &self,
        endpoint: &str,
        method: &str,
        status_code: u16,
        response: Option<Value>,
        request_data: Option<Value>,
    ) {
        let level = if status_code >= crmbridge_domain::constants::HTTP_ERROR_STATUS_THRESHOLD {
            LogLevel::Error
        } else {
            LogLevel::Info
        };
        let message = format!("API {method} {endpoint} returned {status_code}");
        let context = json!({
            "endpoint": endpoint,
            "method": method,
            "status_code": status_code,
            "response": response,
            "request": request_data,
        });

        self.log(level, &message, Some(context), None, Some(TRIGGER_API_CALL)).await;
    }

    /// Token lifecycle events. Failures log at error level.
    pub async fn log_auth_event(&self, event: &str, success: bool, details: Option<Value>) {
        let (level, outcome) =
            if success { (LogLevel::Info, "succeeded") } else { (LogLevel::Error, "failed") };
        let message = format!("Authentication {event} {outcome}");

        self.log(level, &message, details, None, Some(TRIGGER_AUTH)).await;
    }

    /// Persist an outbound-write audit record.
    ///
    /// Never fails. A rejected record is forwarded to the diagnostic sink.
    pub async fn log_operation(&self, record: &AuditRecord) {
        if let Err(err) = self.audits.record(record).await {
            warn!(error = %err, object_type = %record.object_type, "audit record could not be persisted");
            let context = serde_json::to_value(record).unwrap_or(Value::Null);
            self.diagnostics.emit(LogLevel::Error, "audit record could not be persisted", &context);
        }
    }

    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.logs.query(filter).await
    }

    /// Total matching entries, ignoring paging.
    pub async fn count_logs(&self, filter: &LogFilter) -> Result<u64> {
        self.logs.count(filter).await
    }

    pub async fn get_log_stats(&self) -> Result<LogStats> {
        let now = self.clock.now();
        let by_level = self.logs.count_by_level().await?;
        let recent_24h = self.logs.count_since(now - Duration::hours(24), None).await?;
        let errors_7d = self.logs.count_since(now - Duration::days(7), Some(LogLevel::Error)).await?;

        Ok(LogStats { by_level, recent_24h, errors_7d })
    }

    /// Delete every entry, or every entry of one level.
    pub async fn clear_logs(&self, level: Option<LogLevel>) -> Result<u64> {
        let deleted = self.logs.delete(level).await?;
        debug!(deleted, level = ?level, "logs cleared");
        Ok(deleted)
    }

    /// Serialise matching entries. An unknown `format` yields `Ok(None)`.
    pub async fn export_logs(&self, format: &str, filter: &LogFilter) -> Result<Option<String>> {
        let Ok(format) = format.parse::<ExportFormat>() else {
            debug!(format, "unsupported export format");
            return Ok(None);
        };

        let entries = self.logs.query(filter).await?;
        export::render(&entries, format).map(Some)
    }

    pub async fn is_level_enabled(&self, level: LogLevel) -> bool {
        let key = level_option_key(level);
        match self.options.get(&key).await {
            Ok(Some(value)) => parse_flag(&value).unwrap_or_else(|| {
                warn!(option = %key, value = %value, "unrecognised log level flag, using default");
                self.default_enabled(level)
            }),
            Ok(None) => self.default_enabled(level),
            Err(err) => {
                warn!(error = %err, option = %key, "falling back to default log level flag");
                self.default_enabled(level)
            }
        }
    }

    pub async fn set_level_enabled(&self, level: LogLevel, enabled: bool) -> Result<()> {
        self.options.set(&level_option_key(level), if enabled { "1" } else { "0" }).await
    }

    /// Retention cap; unparsable or zero values fall back to the default.
    pub async fn max_entries(&self) -> u32 {
        match self.options.get(options::LOG_MAX_ENTRIES).await {
            Ok(Some(value)) => {
                value.trim().parse().ok().filter(|n| *n > 0).unwrap_or(self.defaults.max_entries)
            }
            Ok(None) => self.defaults.max_entries,
            Err(err) => {
                warn!(error = %err, "falling back to default log retention cap");
                self.defaults.max_entries
            }
        }
    }

    pub async fn set_max_entries(&self, max_entries: u32) -> Result<()> {
        if max_entries == 0 {
            return Err(crmbridge_domain::CrmBridgeError::InvalidInput(
                "log_max_entries must be at least 1".to_string(),
            ));
        }
        self.options.set(options::LOG_MAX_ENTRIES, &max_entries.to_string()).await
    }

    async fn enforce_retention(&self) {
        let keep = self.max_entries().await;
        match self.logs.retain_latest(keep).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, keep, "trimmed log store"),
            Err(err) => warn!(error = %err, "log retention trim failed"),
        }
    }

    fn default_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Error => self.defaults.error_enabled,
            LogLevel::Warning => self.defaults.warning_enabled,
            LogLevel::Info => self.defaults.info_enabled,
            LogLevel::Debug => self.defaults.debug_enabled,
        }
    }
}

fn level_option_key(level: LogLevel) -> String {
    format!("{}{}", options::LOG_LEVEL_PREFIX, level.as_str())
}

/// Flags are written as `"1"`/`"0"`; hand-edited values may use the usual
/// boolean spellings.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
