//! Persistence of a token triple in the option store.

use chrono::{DateTime, Utc};
use crmbridge_core::options_ports::OptionStore;
use crmbridge_domain::constants::options;
use crmbridge_domain::{CrmBridgeError, Result, TokenState};

/// Option keys holding one strategy's token triple.
#[derive(Debug, Clone, Copy)]
pub struct TokenKeys {
    pub access_token: &'static str,
    pub instance_url: &'static str,
    pub expiry: &'static str,
}

pub const PASSWORD_GRANT_KEYS: TokenKeys = TokenKeys {
    access_token: options::ACCESS_TOKEN,
    instance_url: options::INSTANCE_URL,
    expiry: options::TOKEN_EXPIRY,
};

pub const WEB_SERVER_KEYS: TokenKeys = TokenKeys {
    access_token: options::OAUTH_ACCESS_TOKEN,
    instance_url: options::OAUTH_INSTANCE_URL,
    expiry: options::OAUTH_TOKEN_EXPIRY,
};

/// `now + ttl_secs`, truncated to the whole second the store keeps.
///
/// A lifetime that leaves the representable date range is rejected as an
/// authentication failure; the provider answer cannot be trusted.
pub fn expiry_after(now: DateTime<Utc>, ttl_secs: i64) -> Result<DateTime<Utc>> {
    let expires_at = chrono::Duration::try_seconds(ttl_secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            CrmBridgeError::Authentication(format!("invalid expires_in from provider: {ttl_secs}"))
        })?;
    Ok(DateTime::<Utc>::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at))
}

/// Read the cached triple. Missing keys read as empty and unparsable expiry
/// as the distant past, so the result is simply invalid rather than an error.
pub async fn load(store: &dyn OptionStore, keys: TokenKeys) -> Result<TokenState> {
    let access_token = store.get(keys.access_token).await?.unwrap_or_default();
    let instance_url = store.get(keys.instance_url).await?.unwrap_or_default();
    let expires_at = store
        .get(keys.expiry)
        .await?
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    Ok(TokenState { access_token, instance_url, expires_at })
}

/// Replace the triple in one atomic write. Expiry is stored as unix seconds.
pub async fn save(store: &dyn OptionStore, keys: TokenKeys, token: &TokenState) -> Result<()> {
    let expiry = token.expires_at.timestamp().to_string();
    store
        .set_many(&[
            (keys.access_token, token.access_token.as_str()),
            (keys.instance_url, token.instance_url.as_str()),
            (keys.expiry, expiry.as_str()),
        ])
        .await
}
