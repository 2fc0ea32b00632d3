//! Structured log store and audit entry point.

pub mod export;
pub mod ports;
pub mod service;

pub use ports::{AuditRepository, DiagnosticSink, LogRepository};
pub use service::LogService;
