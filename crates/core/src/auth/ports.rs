//! Port interface for token strategies

use async_trait::async_trait;
use crmbridge_domain::{Result, TokenState};

/// A source of bearer tokens for the CRM REST API.
///
/// Implemented by the password-grant manager and by the web-server OAuth
/// flow manager. The password-grant manager holds the other as its preferred
/// alternate and defers to it whenever that one reports a valid token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Check the cached token without touching the network.
    async fn is_token_valid(&self) -> bool;

    /// Return a usable token, authenticating or refreshing if needed.
    async fn get_valid_token(&self) -> Result<TokenState>;

    /// Cheap authenticated round trip. Never fails; any error is `false`.
    async fn test_connection(&self) -> bool;
}
