//! CRM REST integration
//!
//! Token strategies ([`PasswordTokenManager`], [`OAuthTokenManager`]) and the
//! record [`CrmSyncClient`] built on top of them.

pub mod client;
pub mod errors;
pub mod oauth;
pub mod password_auth;
pub mod token_endpoint;
pub mod token_store;

pub use client::CrmSyncClient;
pub use errors::{CrmError, CrmErrorCategory};
pub use oauth::OAuthTokenManager;
pub use password_auth::PasswordTokenManager;
