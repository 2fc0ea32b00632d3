//! CRM record sync client
//!
//! Writes records through the REST `sobjects` API. Every outbound write is
//! audited through [`AuditScope`], which records exactly one row per call on
//! every exit path, including cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crmbridge_core::auth::ports::TokenProvider;
use crmbridge_core::logging::LogService;
use crmbridge_core::sync::ports::RecordSync;
use crmbridge_domain::{
    AuditOperation, AuditRecord, AuditStatus, CrmBridgeError, CrmConfig, Result, TokenState,
};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::errors::{CrmError, CrmErrorCategory};
use crate::http::HttpClient;

/// Audit row pending for one outbound call.
///
/// Finish it with [`succeed`](Self::succeed) or [`fail`](Self::fail). If the
/// scope is dropped unfinished (the future was cancelled or panicked), an
/// error row is written from a spawned task instead.
struct AuditScope {
    logs: Arc<LogService>,
    started: Instant,
    record: Option<AuditRecord>,
}

impl AuditScope {
    fn begin(
        logs: Arc<LogService>,
        operation: AuditOperation,
        object_type: &str,
        local_record_id: Option<String>,
        request_payload: Value,
    ) -> Self {
        let record = AuditRecord {
            operation,
            object_type: object_type.to_string(),
            remote_record_id: String::new(),
            local_record_id,
            status: AuditStatus::Error,
            message: "operation aborted before completion".to_string(),
            request_payload,
            response_payload: None,
            error_detail: None,
            execution_time: Duration::ZERO,
        };

        Self { logs, started: Instant::now(), record: Some(record) }
    }

    async fn succeed(mut self, remote_record_id: String, response: Value, message: String) {
        if let Some(mut record) = self.take() {
            record.status = AuditStatus::Success;
            record.remote_record_id = remote_record_id;
            record.response_payload = Some(response);
            record.message = message;
            self.logs.log_operation(&record).await;
        }
    }

    async fn fail(mut self, message: String, detail: Value) {
        if let Some(mut record) = self.take() {
            record.message = message;
            record.error_detail = Some(detail);
            self.logs.log_operation(&record).await;
        }
    }

    fn take(&mut self) -> Option<AuditRecord> {
        let mut record = self.record.take()?;
        record.execution_time = self.started.elapsed();
        Some(record)
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        let Some(mut record) = self.take() else {
            return;
        };
        record.error_detail = Some(json!({ "category": "aborted" }));

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let logs = Arc::clone(&self.logs);
                handle.spawn(async move { logs.log_operation(&record).await });
            }
            Err(_) => {
                warn!(
                    object_type = %record.object_type,
                    operation = %record.operation,
                    "audit scope dropped outside a runtime; record lost"
                );
            }
        }
    }
}

/// A failed call together with the detail recorded in the audit row.
#[derive(Debug)]
struct CallFailure {
    error: CrmBridgeError,
    detail: Value,
}

impl From<CrmError> for CallFailure {
    fn from(err: CrmError) -> Self {
        Self { detail: err.detail(), error: err.into_domain_error() }
    }
}

impl From<CrmBridgeError> for CallFailure {
    fn from(error: CrmBridgeError) -> Self {
        let detail = json!({
            "category": error.label(),
            "status": Value::Null,
            "message": error.to_string(),
        });
        Self { error, detail }
    }
}

impl From<reqwest::Error> for CallFailure {
    fn from(err: reqwest::Error) -> Self {
        CrmError::from(err).into()
    }
}

/// Sync client for the CRM REST API.
pub struct CrmSyncClient {
    config: CrmConfig,
    tokens: Arc<dyn TokenProvider>,
    logs: Arc<LogService>,
    http: HttpClient,
}

impl CrmSyncClient {
    pub fn new(
        config: CrmConfig,
        tokens: Arc<dyn TokenProvider>,
        logs: Arc<LogService>,
    ) -> Result<Self> {
        let http = HttpClient::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { config, tokens, logs, http })
    }

    fn sobjects_url(&self, token: &TokenState, object_type: &str) -> String {
        format!(
            "{}/services/data/{}/sobjects/{}",
            token.instance_url.trim_end_matches('/'),
            self.config.api_version,
            object_type
        )
    }

    /// Send one authenticated JSON request and decode the body.
    ///
    /// Any HTTP status is returned as `Ok`; empty bodies decode to `{}`.
    async fn send_json(
        &self,
        method: Method,
        url: &str,
        token: &TokenState,
        payload: &Value,
    ) -> std::result::Result<(StatusCode, Value), CallFailure> {
        let request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&token.access_token)
            .json(payload);

        let response = match self.http.send(request).await {
            Ok(response) => response,
            Err(err) => {
                self.logs
                    .error(
                        &format!("API {method} {url} failed"),
                        Some(json!({ "endpoint": url, "method": method.as_str(), "error": err.to_string() })),
                    )
                    .await;
                return Err(match err {
                    CrmBridgeError::Network(message) => {
                        CrmError::new(CrmErrorCategory::Transport, message).into()
                    }
                    other => other.into(),
                });
            }
        };

        let status = response.status();
        let text = response.text().await?;
        let body = decode_body(status, &text)?;

        self.logs
            .log_api_call(url, method.as_str(), status.as_u16(), Some(body.clone()), Some(payload.clone()))
            .await;

        Ok((status, body))
    }

    async fn create(
        &self,
        object_type: &str,
        payload: &Value,
    ) -> std::result::Result<Value, CallFailure> {
        let token = self.tokens.get_valid_token().await?;
        let url = self.sobjects_url(&token, object_type);

        let (status, body) = self.send_json(Method::POST, &url, &token, payload).await?;
        if !status.is_success() {
            return Err(CrmError::from_response(status, &body).into());
        }
        Ok(body)
    }
}

#[async_trait]
impl RecordSync for CrmSyncClient {
    async fn upsert_record(
        &self,
        object_type: &str,
        external_id_field: &str,
        external_id_value: &str,
        data: Value,
    ) -> Result<Value> {
        let token = self.tokens.get_valid_token().await?;
        let url = format!(
            "{}/{}/{}",
            self.sobjects_url(&token, object_type),
            external_id_field,
            urlencoding::encode(external_id_value)
        );

        let scope = AuditScope::begin(
            Arc::clone(&self.logs),
            AuditOperation::Update,
            object_type,
            Some(external_id_value.to_string()),
            data.clone(),
        );

        let (status, body) = match self.send_json(Method::PATCH, &url, &token, &data).await {
            Ok(result) => result,
            Err(failure) => {
                scope.fail(failure.error.to_string(), failure.detail).await;
                return Err(failure.error);
            }
        };

        if status.is_success() {
            let remote_id = record_id(&body).unwrap_or_default().to_string();
            let message = format!("Updated {object_type} {external_id_field}={external_id_value}");
            scope.succeed(remote_id, body.clone(), message).await;
            return Ok(body);
        }

        let err = CrmError::from_response(status, &body);
        scope.fail(err.message().to_string(), err.detail()).await;

        if status == StatusCode::NOT_FOUND {
            info!(
                object_type,
                external_id_field, external_id_value, "record not found, creating it instead"
            );
            return self
                .create_record(object_type, data, Some((external_id_field, external_id_value)))
                .await;
        }

        Err(err.into())
    }

    async fn create_record(
        &self,
        object_type: &str,
        data: Value,
        external_id: Option<(&str, &str)>,
    ) -> Result<Value> {
        let mut payload = data;
        let merged = merge_external_id(&mut payload, external_id);
        let local_record_id = external_id.map(|(_, value)| value.to_string());

        let scope = AuditScope::begin(
            Arc::clone(&self.logs),
            AuditOperation::Create,
            object_type,
            local_record_id.clone(),
            payload.clone(),
        );

        let outcome = match merged {
            Ok(()) => self.create(object_type, &payload).await,
            Err(err) => Err(CallFailure::from(err)),
        };
        let post_id = local_record_id.as_deref().and_then(|id| id.parse::<i64>().ok());

        match outcome {
            Ok(body) => {
                let remote_id = record_id(&body).unwrap_or_default().to_string();
                debug!(object_type, remote_id = %remote_id, "record created");
                scope.succeed(remote_id.clone(), body.clone(), format!("Created {object_type} {remote_id}")).await;
                if let Some(post_id) = post_id {
                    self.logs
                        .log_sync_attempt(post_id, "create", true, Some(json!({ "remote_id": remote_id })))
                        .await;
                }
                Ok(body)
            }
            Err(failure) => {
                warn!(object_type, error = %failure.error, "record creation failed");
                scope.fail(failure.error.to_string(), failure.detail.clone()).await;
                if let Some(post_id) = post_id {
                    self.logs.log_sync_attempt(post_id, "create", false, Some(failure.detail)).await;
                }
                Err(failure.error)
            }
        }
    }

    async fn test_connection(&self) -> bool {
        self.tokens.test_connection().await
    }
}

/// Stamp `field = value` into an object payload.
fn merge_external_id(
    payload: &mut Value,
    external_id: Option<(&str, &str)>,
) -> std::result::Result<(), CrmBridgeError> {
    let Some((field, value)) = external_id else {
        return Ok(());
    };

    match payload {
        Value::Object(map) => {
            map.insert(field.to_string(), Value::String(value.to_string()));
            Ok(())
        }
        other => Err(CrmBridgeError::InvalidInput(format!(
            "record payload must be a JSON object to carry {field}, got {}",
            json_kind(other)
        ))),
    }
}

fn decode_body(status: StatusCode, text: &str) -> std::result::Result<Value, CrmError> {
    if text.trim().is_empty() {
        return Ok(json!({}));
    }

    match serde_json::from_str(text) {
        Ok(body) => Ok(body),
        // Error pages are kept verbatim so the audit row shows what came back.
        Err(_) if !status.is_success() => Ok(Value::String(text.to_string())),
        Err(err) => Err(CrmError::new(
            CrmErrorCategory::Unknown,
            format!("unreadable response (HTTP {status}): {err}"),
        )),
    }
}

fn record_id(body: &Value) -> Option<&str> {
    body.get("id")?.as_str()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_is_merged_into_objects() {
        let mut payload = json!({"LastName": "Doe"});
        merge_external_id(&mut payload, Some(("Post_Id__c", "42"))).unwrap();
        assert_eq!(payload, json!({"LastName": "Doe", "Post_Id__c": "42"}));
    }

    #[test]
    fn external_id_requires_object_payload() {
        let mut payload = json!(["not", "an", "object"]);
        let err = merge_external_id(&mut payload, Some(("Post_Id__c", "42"))).unwrap_err();
        assert!(matches!(err, CrmBridgeError::InvalidInput(msg) if msg.contains("array")));

        let mut untouched = json!(7);
        merge_external_id(&mut untouched, None).unwrap();
        assert_eq!(untouched, json!(7));
    }

    #[test]
    fn empty_bodies_decode_to_empty_object() {
        assert_eq!(decode_body(StatusCode::NO_CONTENT, "").unwrap(), json!({}));
        assert_eq!(decode_body(StatusCode::OK, "  ").unwrap(), json!({}));
    }

    #[test]
    fn non_json_bodies() {
        assert_eq!(
            decode_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap(),
            Value::String("<html>bad gateway</html>".into())
        );
        let err = decode_body(StatusCode::OK, "<html>").unwrap_err();
        assert_eq!(err.category(), CrmErrorCategory::Unknown);
    }

    #[tokio::test]
    async fn dropped_scope_records_an_error() {
        use crmbridge_common::time::MockClock;
        use crmbridge_core::logging::ports::{AuditRepository, DiagnosticSink, LogRepository};
        use crmbridge_core::options_ports::MemoryOptionStore;

        use crate::database::{DbManager, SqliteAuditRepository, SqliteLogRepository};
        use crate::observability::diagnostics::TracingDiagnosticSink;

        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(DbManager::new(dir.path().join("scope.db"), 2).unwrap());
        db.run_migrations().unwrap();
        let clock = Arc::new(MockClock::new());
        let audits = Arc::new(SqliteAuditRepository::new(Arc::clone(&db), clock.clone()));
        let logs: Arc<dyn LogRepository> =
            Arc::new(SqliteLogRepository::new(Arc::clone(&db), clock.clone()));
        let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnosticSink);
        let service = Arc::new(LogService::new(
            logs,
            audits.clone(),
            Arc::new(MemoryOptionStore::new()),
            sink,
            clock,
        ));

        let scope = AuditScope::begin(
            service,
            AuditOperation::Create,
            "Contact",
            Some("9".into()),
            json!({"LastName": "Doe"}),
        );
        drop(scope);

        let mut rows = Vec::new();
        for _ in 0..50 {
            rows = audits.recent(10).await.unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.status, AuditStatus::Error);
        assert_eq!(rows[0].record.response_payload, None);
        assert_eq!(rows[0].record.local_record_id.as_deref(), Some("9"));
    }
}
