//! Conversions from external infrastructure errors into domain errors.

use crmbridge_domain::CrmBridgeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CrmBridgeError);

impl From<InfraError> for CrmBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CrmBridgeError> for InfraError {
    fn from(value: CrmBridgeError) -> Self {
        InfraError(value)
    }
}

trait IntoCrmBridgeError {
    fn into_crmbridge(self) -> CrmBridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CrmBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCrmBridgeError for SqlError {
    fn into_crmbridge(self) -> CrmBridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CrmBridgeError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CrmBridgeError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        CrmBridgeError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ReadOnly, _) => {
                        CrmBridgeError::Database("database is read-only".into())
                    }
                    _ => CrmBridgeError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CrmBridgeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CrmBridgeError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                CrmBridgeError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => CrmBridgeError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CrmBridgeError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_crmbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CrmBridgeError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(CrmBridgeError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CrmBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCrmBridgeError for HttpError {
    fn into_crmbridge(self) -> CrmBridgeError {
        if self.is_timeout() {
            return CrmBridgeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CrmBridgeError::Network(format!("HTTP connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => CrmBridgeError::Authentication(message),
                404 => CrmBridgeError::NotFound(message),
                400..=499 => CrmBridgeError::InvalidInput(message),
                _ => CrmBridgeError::Network(message),
            };
        }

        if self.is_decode() {
            return CrmBridgeError::Internal(format!("failed to decode HTTP response: {self}"));
        }

        CrmBridgeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_crmbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → CrmBridgeError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(CrmBridgeError::Internal(format!("JSON encoding failed: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: CrmBridgeError = InfraError::from(err).into();
        assert_eq!(mapped, CrmBridgeError::Database("database is busy".into()));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: CrmBridgeError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, CrmBridgeError::NotFound(_)));
    }

    #[test]
    fn json_error_maps_to_internal() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let mapped: CrmBridgeError = InfraError::from(err).into();
        assert!(matches!(mapped, CrmBridgeError::Internal(_)));
    }

    #[tokio::test]
    async fn http_status_401_maps_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: CrmBridgeError = InfraError::from(error).into();
        match mapped {
            CrmBridgeError::Authentication(msg) => assert!(msg.contains("401")),
            other => panic!("expected authentication error, got {other:?}"),
        }
    }
}
