//! Username-password OAuth grant with deferral to the web-server flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crmbridge_common::time::Clock;
use crmbridge_core::auth::ports::TokenProvider;
use crmbridge_core::logging::LogService;
use crmbridge_core::options_ports::OptionStore;
use crmbridge_domain::constants::{options, DEFAULT_TOKEN_TTL_SECS};
use crmbridge_domain::{CrmBridgeError, CrmConfig, Credentials, Result, TokenState};
use serde_json::json;
use tracing::{debug, info, warn};

use super::token_endpoint::{probe_limits, request_token};
use super::token_store::{self, PASSWORD_GRANT_KEYS};
use crate::http::HttpClient;

/// Token manager for the password grant.
///
/// When an alternate provider is attached and reports a valid token, every
/// request is served by it instead. Otherwise the cached triple is used and
/// refreshed by re-authenticating once it expires.
pub struct PasswordTokenManager {
    config: CrmConfig,
    options: Arc<dyn OptionStore>,
    logs: Arc<LogService>,
    clock: Arc<dyn Clock>,
    http: HttpClient,
    alternate: Option<Arc<dyn TokenProvider>>,
}

impl PasswordTokenManager {
    pub fn new(
        config: CrmConfig,
        options: Arc<dyn OptionStore>,
        logs: Arc<LogService>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http = HttpClient::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { config, options, logs, clock, http, alternate: None })
    }

    /// Prefer `alternate` whenever it holds a valid token.
    pub fn with_alternate(mut self, alternate: Arc<dyn TokenProvider>) -> Self {
        self.alternate = Some(alternate);
        self
    }

    /// Stored credentials, with empty or absent options falling back to the
    /// configured values.
    pub async fn credentials(&self) -> Result<Credentials> {
        let configured = self.config.credentials();
        Ok(Credentials {
            client_id: self.option_or(options::CLIENT_ID, configured.client_id).await?,
            client_secret: self.option_or(options::CLIENT_SECRET, configured.client_secret).await?,
            username: self.option_or(options::USERNAME, configured.username).await?,
            password: self.option_or(options::PASSWORD, configured.password).await?,
            security_token: self
                .option_or(options::SECURITY_TOKEN, configured.security_token)
                .await?,
        })
    }

    /// Obtain a fresh token and replace the cached triple.
    ///
    /// Fails with `Configuration` before any network call when a credential
    /// is missing, and with `Authentication` when the provider cannot be
    /// reached or rejects the grant.
    pub async fn authenticate(&self) -> Result<TokenState> {
        let credentials = self.credentials().await?;
        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            self.logs
                .log_auth_event("authenticate", false, Some(json!({ "missing": missing })))
                .await;
            return Err(CrmBridgeError::Configuration(format!(
                "missing CRM credentials: {}",
                missing.join(", ")
            )));
        }

        let password = credentials.password_with_token();
        let form = [
            ("grant_type", "password"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", password.as_str()),
        ];

        let granted = request_token(&self.http, &self.config, &form).await.and_then(|response| {
            let ttl = response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
            Ok((token_store::expiry_after(self.clock.now(), ttl)?, ttl, response))
        });
        let (expires_at, ttl, response) = match granted {
            Ok(granted) => granted,
            Err(err) => {
                warn!(error = %err, "password grant failed");
                self.logs
                    .log_auth_event("authenticate", false, Some(json!({ "error": err.to_string() })))
                    .await;
                return Err(err);
            }
        };

        let token = TokenState {
            access_token: response.access_token,
            instance_url: response.instance_url,
            expires_at,
        };
        token_store::save(self.options.as_ref(), PASSWORD_GRANT_KEYS, &token).await?;

        info!(instance_url = %token.instance_url, ttl_secs = ttl, "password grant succeeded");
        self.logs
            .log_auth_event(
                "authenticate",
                true,
                Some(json!({ "instance_url": token.instance_url, "expires_at": token.expires_at })),
            )
            .await;

        Ok(token)
    }

    /// The cached triple, valid or not.
    pub async fn cached_token(&self) -> Result<TokenState> {
        token_store::load(self.options.as_ref(), PASSWORD_GRANT_KEYS).await
    }

    async fn option_or(&self, key: &str, fallback: String) -> Result<String> {
        Ok(self.options.get(key).await?.filter(|v| !v.trim().is_empty()).unwrap_or(fallback))
    }

    async fn usable_alternate(&self) -> Option<&Arc<dyn TokenProvider>> {
        let alternate = self.alternate.as_ref()?;
        if alternate.is_token_valid().await {
            debug!(provider = alternate.name(), "deferring to alternate token provider");
            Some(alternate)
        } else {
            None
        }
    }
}

#[async_trait]
impl TokenProvider for PasswordTokenManager {
    fn name(&self) -> &'static str {
        "password"
    }

    async fn is_token_valid(&self) -> bool {
        match self.cached_token().await {
            Ok(token) => token.is_valid_at(self.clock.now()),
            Err(err) => {
                warn!(error = %err, "could not read cached token");
                false
            }
        }
    }

    async fn get_valid_token(&self) -> Result<TokenState> {
        if let Some(alternate) = self.usable_alternate().await {
            return alternate.get_valid_token().await;
        }

        let cached = self.cached_token().await?;
        if cached.is_valid_at(self.clock.now()) {
            return Ok(cached);
        }

        debug!("cached token missing or expired, re-authenticating");
        self.authenticate().await
    }

    async fn test_connection(&self) -> bool {
        if let Some(alternate) = self.usable_alternate().await {
            return alternate.test_connection().await;
        }

        let token = match self.authenticate().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "connection test could not authenticate");
                return false;
            }
        };

        let ok = probe_limits(&self.http, &self.config, &token.instance_url, &token.access_token)
            .await;
        self.logs.log_auth_event("test_connection", ok, None).await;
        ok
    }
}
