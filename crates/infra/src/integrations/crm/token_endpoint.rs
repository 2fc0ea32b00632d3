//! Calls to the provider's OAuth token endpoint and the API probe shared by
//! both token strategies.

use crmbridge_common::auth::{OAuthErrorResponse, TokenResponse};
use crmbridge_domain::constants::TOKEN_ENDPOINT_PATH;
use crmbridge_domain::{CrmBridgeError, CrmConfig, Result};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::HttpClient;

/// `{login_url}/services/oauth2/token`
pub fn token_url(config: &CrmConfig) -> String {
    format!("{}{}", config.login_url.trim_end_matches('/'), TOKEN_ENDPOINT_PATH)
}

/// POST a form to the token endpoint.
///
/// Every failure is an `Authentication` error: transport failures carry the
/// transport detail, provider rejections carry `error_description` (or
/// `error` when no description is given).
pub async fn request_token(
    http: &HttpClient,
    config: &CrmConfig,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let url = token_url(config);
    let response = http
        .send(http.request(Method::POST, &url).form(form))
        .await
        .map_err(|e| CrmBridgeError::Authentication(format!("token request failed: {e}")))?;

    let status = response.status();
    let body: Value = response.json().await.map_err(|e| {
        CrmBridgeError::Authentication(format!("unreadable token response (HTTP {status}): {e}"))
    })?;

    if body.get("error").is_some() {
        let error: OAuthErrorResponse = serde_json::from_value(body).map_err(|e| {
            CrmBridgeError::Authentication(format!("malformed token error response: {e}"))
        })?;
        debug!(error = %error.error, "token endpoint rejected the request");
        return Err(CrmBridgeError::Authentication(error.description().to_string()));
    }

    if !status.is_success() {
        return Err(CrmBridgeError::Authentication(format!(
            "token endpoint returned HTTP {status}"
        )));
    }

    serde_json::from_value(body)
        .map_err(|e| CrmBridgeError::Authentication(format!("malformed token response: {e}")))
}

/// `GET {instance_url}/services/data/{api_version}/limits`.
///
/// True on any 2xx. Never fails.
pub async fn probe_limits(
    http: &HttpClient,
    config: &CrmConfig,
    instance_url: &str,
    access_token: &str,
) -> bool {
    let url = format!(
        "{}/services/data/{}/limits",
        instance_url.trim_end_matches('/'),
        config.api_version
    );

    match http.send(http.request(Method::GET, &url).bearer_auth(access_token)).await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            warn!(status = response.status().as_u16(), "connection probe rejected");
            false
        }
        Err(err) => {
            warn!(error = %err, "connection probe failed");
            false
        }
    }
}
