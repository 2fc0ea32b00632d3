//! Database implementations

pub mod audit_repository;
pub mod log_repository;
pub mod manager;
pub mod option_store;

pub use audit_repository::SqliteAuditRepository;
pub use log_repository::SqliteLogRepository;
pub use manager::{DbConnection, DbManager};
pub use option_store::SqliteOptionStore;
