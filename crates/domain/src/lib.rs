//! # CRM Bridge Domain
//!
//! Business domain types and models for CRM Bridge.
//!
//! This crate contains:
//! - Log, audit and token data types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Option keys and defaults
//!
//! ## Architecture
//! - No dependencies on other CRM Bridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
