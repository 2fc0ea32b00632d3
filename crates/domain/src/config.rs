//! Configuration structures
//!
//! Loaded once at startup (see `crmbridge_infra::config::loader`) and passed
//! into each component at construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_VERSION, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOGIN_URL, DEFAULT_LOG_MAX_ENTRIES,
};
use crate::types::Credentials;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// SQLite store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "crmbridge.db".to_string(), pool_size: default_pool_size() }
    }
}

fn default_pool_size() -> u32 {
    4
}

/// Remote CRM connection settings.
///
/// Credential fields may be left empty here; the token manager reports a
/// configuration error when it actually needs them.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CrmConfig {
    pub login_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub security_token: String,
    /// Callback registered for the web-server OAuth flow.
    pub redirect_uri: Option<String>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            security_token: String::new(),
            redirect_uri: None,
        }
    }
}

impl CrmConfig {
    /// Credentials for the password grant.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            security_token: self.security_token.clone(),
        }
    }
}

// Secrets never reach log output through `{:?}`.
impl fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrmConfig")
            .field("login_url", &self.login_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Log store and tracing settings.
///
/// `*_enabled` and `max_entries` are the defaults used when the option
/// store holds no override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub error_enabled: bool,
    pub warning_enabled: bool,
    pub info_enabled: bool,
    pub debug_enabled: bool,
    pub max_entries: u32,
    /// `EnvFilter` directive for process-level tracing output.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            error_enabled: true,
            warning_enabled: true,
            info_enabled: true,
            debug_enabled: false,
            max_entries: DEFAULT_LOG_MAX_ENTRIES,
            filter: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_defaults_disable_debug_only() {
        let config = LoggingConfig::default();
        assert!(config.error_enabled);
        assert!(config.warning_enabled);
        assert!(config.info_enabled);
        assert!(!config.debug_enabled);
        assert_eq!(config.max_entries, 1000);
    }

    #[test]
    fn crm_debug_output_hides_secrets() {
        let config = CrmConfig {
            client_secret: "s3cr3t".into(),
            password: "hunter2".into(),
            security_token: "tok".into(),
            ..CrmConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn partial_json_uses_section_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "database": { "path": "x.db" } }"#).unwrap();
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.crm.api_version, "v58.0");
        assert!(!config.logging.debug_enabled);
    }
}
