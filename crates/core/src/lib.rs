//! # CRM Bridge Core
//!
//! Business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for storage, options and the CRM
//! - The log store service (level gating, retention, stats, export, audit
//!   entry point)
//!
//! ## Architecture Principles
//! - Only depends on `crmbridge-common` and `crmbridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod auth;
pub mod logging;
pub mod options_ports;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use auth::ports::TokenProvider;
pub use logging::ports::{AuditRepository, DiagnosticSink, LogRepository};
pub use logging::LogService;
pub use options_ports::{MemoryOptionStore, OptionStore};
pub use sync::ports::RecordSync;
