//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CRMBRIDGE_DB_PATH` is absent or a value is malformed, falls back to
//!    loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `CRMBRIDGE_DB_PATH`: Database file path (required)
//! - `CRMBRIDGE_DB_POOL_SIZE`: Connection pool size
//! - `CRMBRIDGE_CRM_LOGIN_URL`: OAuth login host
//! - `CRMBRIDGE_CRM_API_VERSION`: REST API version, e.g. `v58.0`
//! - `CRMBRIDGE_CRM_TIMEOUT_SECS`: HTTP timeout in seconds
//! - `CRMBRIDGE_CRM_CLIENT_ID`, `CRMBRIDGE_CRM_CLIENT_SECRET`
//! - `CRMBRIDGE_CRM_USERNAME`, `CRMBRIDGE_CRM_PASSWORD`,
//!   `CRMBRIDGE_CRM_SECURITY_TOKEN`
//! - `CRMBRIDGE_CRM_REDIRECT_URI`: Web-server flow callback
//! - `CRMBRIDGE_LOG_FILTER`: tracing `EnvFilter` directive
//! - `CRMBRIDGE_LOG_JSON`: JSON tracing output (true/false)
//! - `CRMBRIDGE_LOG_DEBUG`: Store debug-level entries (true/false)
//! - `CRMBRIDGE_LOG_MAX_ENTRIES`: Log retention cap
//!
//! ## File Locations
//! The loader probes `config.{json,toml}` and `crmbridge.{json,toml}` in the
//! working directory, its two parents, and beside the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crmbridge_domain::{Config, CrmBridgeError, CrmConfig, DatabaseConfig, LoggingConfig, Result};

/// Load configuration, preferring the environment and falling back to a file.
///
/// # Errors
/// Returns `CrmBridgeError::Configuration` if neither source yields a
/// valid configuration.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `CRMBRIDGE_*` environment variables.
///
/// Only `CRMBRIDGE_DB_PATH` is required; everything else has a default.
///
/// # Errors
/// Returns `CrmBridgeError::Configuration` if the database path is missing
/// or a numeric value does not parse.
pub fn load_from_env() -> Result<Config> {
    let database = DatabaseConfig {
        path: env_var("CRMBRIDGE_DB_PATH")?,
        pool_size: env_parse("CRMBRIDGE_DB_POOL_SIZE")?
            .unwrap_or(DatabaseConfig::default().pool_size),
    };

    let defaults = CrmConfig::default();
    let crm = CrmConfig {
        login_url: env_opt("CRMBRIDGE_CRM_LOGIN_URL").unwrap_or(defaults.login_url),
        api_version: env_opt("CRMBRIDGE_CRM_API_VERSION").unwrap_or(defaults.api_version),
        timeout_secs: env_parse("CRMBRIDGE_CRM_TIMEOUT_SECS")?.unwrap_or(defaults.timeout_secs),
        client_id: env_opt("CRMBRIDGE_CRM_CLIENT_ID").unwrap_or_default(),
        client_secret: env_opt("CRMBRIDGE_CRM_CLIENT_SECRET").unwrap_or_default(),
        username: env_opt("CRMBRIDGE_CRM_USERNAME").unwrap_or_default(),
        password: env_opt("CRMBRIDGE_CRM_PASSWORD").unwrap_or_default(),
        security_token: env_opt("CRMBRIDGE_CRM_SECURITY_TOKEN").unwrap_or_default(),
        redirect_uri: env_opt("CRMBRIDGE_CRM_REDIRECT_URI"),
    };

    let log_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        filter: env_opt("CRMBRIDGE_LOG_FILTER").unwrap_or(log_defaults.filter),
        json: env_bool("CRMBRIDGE_LOG_JSON", log_defaults.json),
        debug_enabled: env_bool("CRMBRIDGE_LOG_DEBUG", log_defaults.debug_enabled),
        max_entries: env_parse("CRMBRIDGE_LOG_MAX_ENTRIES")?.unwrap_or(log_defaults.max_entries),
        ..log_defaults
    };

    Ok(Config { database, crm, logging })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. Format is chosen by file extension.
///
/// # Errors
/// Returns `CrmBridgeError::Configuration` if the file is missing,
/// unreadable, or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CrmBridgeError::Configuration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CrmBridgeError::Configuration(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(|e| {
        CrmBridgeError::Configuration(format!("Failed to read config file: {e}"))
    })?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CrmBridgeError::Configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CrmBridgeError::Configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(CrmBridgeError::Configuration(format!(
            "Unsupported config format: {extension}"
        ))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.json", "config.toml", "crmbridge.json", "crmbridge.toml"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CrmBridgeError::Configuration(format!("Missing required environment variable: {key}"))
    })
}

/// Set and non-empty.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                CrmBridgeError::Configuration(format!("Invalid value for {key}: {e}"))
            })
        })
        .transpose()
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
