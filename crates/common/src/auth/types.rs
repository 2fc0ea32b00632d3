//! OAuth 2.0 token endpoint types
//!
//! Shapes returned by the CRM's `/services/oauth2/token` endpoint for the
//! password, authorization-code and refresh-token grants.

use std::fmt;

use serde::Deserialize;

/// Successful token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Base URL for subsequent REST calls.
    pub instance_url: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds. Some providers omit it.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("instance_url", &self.instance_url)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// OAuth error body (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl OAuthErrorResponse {
    /// Human readable description, falling back to the error code.
    pub fn description(&self) -> &str {
        self.error_description.as_deref().filter(|d| !d.is_empty()).unwrap_or(&self.error)
    }
}

impl fmt::Display for OAuthErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthErrorResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_password_grant_response_without_expiry() {
        let body = r#"{
            "access_token": "00D!AQ",
            "instance_url": "https://na1.example.com",
            "id": "https://login.example.com/id/00D/005",
            "token_type": "Bearer",
            "issued_at": "1700000000000",
            "signature": "abc"
        }"#;

        let response: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.access_token, "00D!AQ");
        assert_eq!(response.instance_url, "https://na1.example.com");
        assert!(response.expires_in.is_none());
        assert!(response.refresh_token.is_none());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let response = TokenResponse {
            access_token: "secret-access".into(),
            instance_url: "https://x".into(),
            refresh_token: Some("secret-refresh".into()),
            token_type: None,
            expires_in: Some(3600),
            issued_at: None,
            scope: None,
        };
        let rendered = format!("{response:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn error_description_falls_back_to_code() {
        let error = OAuthErrorResponse {
            error: "invalid_grant".into(),
            error_description: Some("authentication failure".into()),
        };
        assert_eq!(error.description(), "authentication failure");
        assert_eq!(error.to_string(), "invalid_grant: authentication failure");

        let bare = OAuthErrorResponse { error: "invalid_client_id".into(), error_description: None };
        assert_eq!(bare.description(), "invalid_client_id");
    }
}
