//! Domain types and models

pub mod audit;
pub mod auth;
pub mod log;

pub use audit::{AuditEntry, AuditOperation, AuditRecord, AuditStatus};
pub use auth::{Credentials, TokenState};
pub use log::{ExportFormat, LogEntry, LogFilter, LogLevel, LogStats, NewLogEntry, SortOrder};
