//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// CRM endpoints
pub const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
pub const DEFAULT_API_VERSION: &str = "v58.0";
pub const TOKEN_ENDPOINT_PATH: &str = "/services/oauth2/token";
pub const AUTHORIZE_ENDPOINT_PATH: &str = "/services/oauth2/authorize";
pub const REVOKE_ENDPOINT_PATH: &str = "/services/oauth2/revoke";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Token lifetime assumed when the provider omits `expires_in` (2 hours).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7200;

// Log store
pub const DEFAULT_LOG_MAX_ENTRIES: u32 = 1000;
pub const DEFAULT_LOG_PAGE_SIZE: u32 = 100;
pub const HTTP_ERROR_STATUS_THRESHOLD: u16 = 400;

/// Keys understood by the option store.
pub mod options {
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const SECURITY_TOKEN: &str = "security_token";

    // Password-grant token triple
    pub const INSTANCE_URL: &str = "instance_url";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const TOKEN_EXPIRY: &str = "token_expiry";

    // Web-server flow token set
    pub const OAUTH_ACCESS_TOKEN: &str = "oauth_access_token";
    pub const OAUTH_REFRESH_TOKEN: &str = "oauth_refresh_token";
    pub const OAUTH_INSTANCE_URL: &str = "oauth_instance_url";
    pub const OAUTH_TOKEN_EXPIRY: &str = "oauth_token_expiry";

    // Log store settings
    pub const LOG_MAX_ENTRIES: &str = "log_max_entries";
    pub const LOG_LEVEL_PREFIX: &str = "log_level_";
}
