//! OAuth 2.0 building blocks shared by the password-grant and web-server
//! token strategies.
//!
//! - **[`types`]**: token endpoint responses and provider error bodies
//! - **[`pkce`]**: RFC 7636 challenge generation and CSRF state tokens

pub mod pkce;
pub mod types;

pub use pkce::{generate_code_challenge, generate_state, validate_state, PkceChallenge};
pub use types::{OAuthErrorResponse, TokenResponse};
