//! Web-server OAuth flow (authorization code with PKCE)
//!
//! The admin connects once through the browser; afterwards the refresh token
//! keeps the access token current. The password-grant manager defers to this
//! one whenever it holds a valid token.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crmbridge_common::auth::{validate_state, PkceChallenge, TokenResponse};
use crmbridge_common::time::Clock;
use crmbridge_core::auth::ports::TokenProvider;
use crmbridge_core::logging::LogService;
use crmbridge_core::options_ports::OptionStore;
use crmbridge_domain::constants::{
    options, AUTHORIZE_ENDPOINT_PATH, DEFAULT_TOKEN_TTL_SECS, REVOKE_ENDPOINT_PATH,
};
use crmbridge_domain::{CrmBridgeError, CrmConfig, Result, TokenState};
use reqwest::Method;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::token_endpoint::{probe_limits, request_token};
use super::token_store::{self, WEB_SERVER_KEYS};
use crate::http::HttpClient;

/// Token manager for the authorization-code flow.
pub struct OAuthTokenManager {
    config: CrmConfig,
    options: Arc<dyn OptionStore>,
    logs: Arc<LogService>,
    clock: Arc<dyn Clock>,
    http: HttpClient,
    pending: Mutex<Option<PkceChallenge>>,
}

impl OAuthTokenManager {
    pub fn new(
        config: CrmConfig,
        options: Arc<dyn OptionStore>,
        logs: Arc<LogService>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http = HttpClient::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { config, options, logs, clock, http, pending: Mutex::new(None) })
    }

    /// Build the browser authorization URL and remember its PKCE challenge.
    ///
    /// Returns `(url, state)`. Only the most recent challenge is kept.
    pub async fn authorization_url(&self) -> Result<(String, String)> {
        let client_id = self.client_id().await?;
        let redirect_uri = self.redirect_uri()?;

        let challenge = PkceChallenge::generate();
        let state = challenge.state.clone();

        let endpoint = format!(
            "{}{}",
            self.config.login_url.trim_end_matches('/'),
            AUTHORIZE_ENDPOINT_PATH
        );
        let url = Url::parse_with_params(
            &endpoint,
            &[
                ("response_type", "code"),
                ("client_id", client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("state", state.as_str()),
                ("code_challenge", challenge.code_challenge.as_str()),
                ("code_challenge_method", challenge.challenge_method()),
            ],
        )
        .map_err(|err| CrmBridgeError::Configuration(format!("invalid OAuth login URL: {err}")))?;

        *self.pending.lock().await = Some(challenge);
        Ok((url.into(), state))
    }

    /// Complete the flow with the code from the redirect callback.
    ///
    /// The challenge is consumed whether or not the exchange succeeds.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenState> {
        let challenge = self.pending.lock().await.take().ok_or_else(|| {
            CrmBridgeError::Authentication("no authorization in progress".to_string())
        })?;

        if !validate_state(&challenge.state, state) {
            self.logs.log_auth_event("oauth_callback", false, Some(json!({"reason": "state"}))).await;
            return Err(CrmBridgeError::Authentication("OAuth state mismatch".to_string()));
        }

        let client_id = self.client_id().await?;
        let client_secret = self.client_secret().await?;
        let redirect_uri = self.redirect_uri()?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", challenge.code_verifier.as_str()),
        ];

        let result = request_token(&self.http, &self.config, &form).await;
        self.store_response("oauth_callback", result).await
    }

    /// Renew the access token with the stored refresh token.
    pub async fn refresh(&self) -> Result<TokenState> {
        let refresh_token = self
            .options
            .get(options::OAUTH_REFRESH_TOKEN)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CrmBridgeError::Authentication("no refresh token stored".to_string()))?;

        let client_id = self.client_id().await?;
        let client_secret = self.client_secret().await?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        let result = request_token(&self.http, &self.config, &form).await;
        self.store_response("oauth_refresh", result).await
    }

    /// Revoke the refresh token (best effort) and forget every stored token.
    pub async fn disconnect(&self) -> Result<()> {
        if let Some(token) = self.options.get(options::OAUTH_REFRESH_TOKEN).await? {
            let url = format!(
                "{}{}",
                self.config.login_url.trim_end_matches('/'),
                REVOKE_ENDPOINT_PATH
            );
            let request = self.http.request(Method::POST, &url).form(&[("token", token.as_str())]);
            if let Err(err) = self.http.send(request).await {
                warn!(error = %err, "token revocation failed, clearing local tokens anyway");
            }
        }

        self.options
            .delete_many(&[
                options::OAUTH_ACCESS_TOKEN,
                options::OAUTH_REFRESH_TOKEN,
                options::OAUTH_INSTANCE_URL,
                options::OAUTH_TOKEN_EXPIRY,
            ])
            .await?;
        self.logs.log_auth_event("oauth_disconnect", true, None).await;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        matches!(self.options.get(options::OAUTH_REFRESH_TOKEN).await, Ok(Some(t)) if !t.is_empty())
    }

    async fn store_response(
        &self,
        event: &str,
        result: Result<TokenResponse>,
    ) -> Result<TokenState> {
        let granted = result.and_then(|response| {
            let ttl = response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
            Ok((token_store::expiry_after(self.clock.now(), ttl)?, response))
        });
        let (expires_at, response) = match granted {
            Ok(granted) => granted,
            Err(err) => {
                self.logs.log_auth_event(event, false, Some(json!({"error": err.to_string()}))).await;
                return Err(err);
            }
        };

        let token = TokenState {
            access_token: response.access_token,
            instance_url: response.instance_url,
            expires_at,
        };

        token_store::save(self.options.as_ref(), WEB_SERVER_KEYS, &token).await?;
        // Refresh responses usually omit the refresh token; keep the old one then.
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            self.options.set(options::OAUTH_REFRESH_TOKEN, &refresh_token).await?;
        }

        info!(event, instance_url = %token.instance_url, "web-server flow token stored");
        self.logs.log_auth_event(event, true, Some(json!({"instance_url": token.instance_url}))).await;
        Ok(token)
    }

    async fn client_id(&self) -> Result<String> {
        self.option_or_config(options::CLIENT_ID, &self.config.client_id).await
    }

    async fn client_secret(&self) -> Result<String> {
        self.option_or_config(options::CLIENT_SECRET, &self.config.client_secret).await
    }

    async fn option_or_config(&self, key: &str, configured: &str) -> Result<String> {
        let value = self
            .options
            .get(key)
            .await?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| configured.to_string());
        if value.trim().is_empty() {
            return Err(CrmBridgeError::Configuration(format!("missing CRM credential: {key}")));
        }
        Ok(value)
    }

    fn redirect_uri(&self) -> Result<&str> {
        self.config.redirect_uri.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
            CrmBridgeError::Configuration("redirect_uri is required for the web-server flow".into())
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenManager {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn is_token_valid(&self) -> bool {
        match token_store::load(self.options.as_ref(), WEB_SERVER_KEYS).await {
            Ok(token) => token.is_valid_at(self.clock.now()),
            Err(err) => {
                warn!(error = %err, "could not read web-server flow token");
                false
            }
        }
    }

    async fn get_valid_token(&self) -> Result<TokenState> {
        let token = token_store::load(self.options.as_ref(), WEB_SERVER_KEYS).await?;
        if token.is_valid_at(self.clock.now()) {
            return Ok(token);
        }

        debug!("web-server flow token expired, refreshing");
        self.refresh().await
    }

    async fn test_connection(&self) -> bool {
        match self.get_valid_token().await {
            Ok(token) => {
                probe_limits(&self.http, &self.config, &token.instance_url, &token.access_token)
                    .await
            }
            Err(err) => {
                warn!(error = %err, "web-server flow connection test failed");
                false
            }
        }
    }
}
