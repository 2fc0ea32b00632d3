//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CRM Bridge
///
/// `Configuration`, `Authentication` and `Sync` are the three kinds callers
/// of the token manager and sync client are expected to branch on. The
/// remaining variants carry infrastructure failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CrmBridgeError {
    /// Required credentials or settings are missing.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token endpoint unreachable or credentials rejected by the provider.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The CRM rejected a record write with a 4xx/5xx status.
    #[error("Sync error (HTTP {status}): {message}")]
    Sync { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CrmBridgeError {
    /// Stable label suitable for structured logging fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Authentication(_) => "authentication",
            Self::Sync { .. } => "sync",
            Self::Database(_) => "database",
            Self::Network(_) => "network",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for CRM Bridge operations
pub type Result<T> = std::result::Result<T, CrmBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_error_display_includes_status_and_message() {
        let err = CrmBridgeError::Sync { status: 400, message: "Required field missing".into() };
        assert_eq!(err.to_string(), "Sync error (HTTP 400): Required field missing");
        assert_eq!(err.label(), "sync");
    }

    #[test]
    fn serializes_with_type_tag() {
        let err = CrmBridgeError::Configuration("client_id is not configured".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Configuration");
        assert_eq!(json["message"], "client_id is not configured");
    }
}
