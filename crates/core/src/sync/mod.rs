//! Outbound record synchronisation.

pub mod ports;

pub use ports::RecordSync;
