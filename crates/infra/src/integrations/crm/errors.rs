//! CRM-specific error types and classification
//!
//! Failed REST calls are classified here before they leave the integration.
//! Callers receive [`CrmBridgeError`] via conversion; the audit trail
//! receives [`CrmError::detail`].

use std::fmt;

use crmbridge_domain::CrmBridgeError;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Fallback used when an error body does not carry a message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Failure class of one CRM call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrmErrorCategory {
    /// Connection refused, DNS failure, TLS failure
    Transport,

    /// No response within the client timeout
    Timeout,

    /// 401 or 403
    Authentication,

    /// 404
    NotFound,

    /// Any other 4xx
    Rejected,

    /// 5xx
    Server,

    /// Response could not be decoded, or anything else unexpected
    Unknown,
}

impl CrmErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }

    fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication,
            404 => Self::NotFound,
            400..=499 => Self::Rejected,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CrmErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified CRM failure with the HTTP status when there was one.
#[derive(Debug, Clone, Error)]
#[error("{category}{}: {message}", http_suffix(.status))]
pub struct CrmError {
    category: CrmErrorCategory,
    status: Option<u16>,
    message: String,
}

impl CrmError {
    pub fn new(category: CrmErrorCategory, message: impl Into<String>) -> Self {
        Self { category, status: None, message: message.into() }
    }

    /// Classify an error status using the CRM's error body.
    ///
    /// The CRM answers failed writes with `[{"message": ..., "errorCode": ...}]`.
    /// The first element's message is used; any other shape falls back to
    /// [`UNKNOWN_ERROR_MESSAGE`].
    pub fn from_response(status: StatusCode, body: &Value) -> Self {
        Self {
            category: CrmErrorCategory::from_status(status),
            status: Some(status.as_u16()),
            message: first_error_message(body).unwrap_or(UNKNOWN_ERROR_MESSAGE).to_string(),
        }
    }

    pub fn category(&self) -> CrmErrorCategory {
        self.category
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured form recorded in the audit trail.
    pub fn detail(&self) -> Value {
        json!({
            "category": self.category,
            "status": self.status,
            "message": self.message,
        })
    }

    /// Convert to domain error type
    pub fn into_domain_error(self) -> CrmBridgeError {
        if let Some(status) = self.status {
            return CrmBridgeError::Sync { status, message: self.message };
        }

        match self.category {
            CrmErrorCategory::Transport | CrmErrorCategory::Timeout => {
                CrmBridgeError::Network(self.message)
            }
            CrmErrorCategory::Authentication => CrmBridgeError::Authentication(self.message),
            CrmErrorCategory::NotFound => CrmBridgeError::NotFound(self.message),
            CrmErrorCategory::Rejected => CrmBridgeError::InvalidInput(self.message),
            CrmErrorCategory::Server | CrmErrorCategory::Unknown => {
                CrmBridgeError::Internal(self.message)
            }
        }
    }
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        let category = if err.is_timeout() {
            CrmErrorCategory::Timeout
        } else if err.is_connect() || err.is_request() {
            CrmErrorCategory::Transport
        } else if let Some(status) = err.status() {
            return Self {
                category: CrmErrorCategory::from_status(status),
                status: Some(status.as_u16()),
                message: err.to_string(),
            };
        } else {
            CrmErrorCategory::Unknown
        };

        Self::new(category, err.to_string())
    }
}

impl From<CrmError> for CrmBridgeError {
    fn from(err: CrmError) -> Self {
        err.into_domain_error()
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn first_error_message(body: &Value) -> Option<&str> {
    body.as_array()?.first()?.get("message")?.as_str()
}
