//! # CRM Bridge Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite stores for logs, audit records and options
//! - HTTP client used for every CRM call
//! - CRM REST integration (token strategies and record sync)
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `crmbridge-core`
//! - Depends on `crmbridge-domain`, `crmbridge-common` and `crmbridge-core`
//! - Contains all "impure" code (I/O, network, database)

pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use context::CrmContext;
pub use database::*;
pub use errors::InfraError;
pub use http::*;
pub use integrations::crm::{
    CrmError, CrmErrorCategory, CrmSyncClient, OAuthTokenManager, PasswordTokenManager,
};
