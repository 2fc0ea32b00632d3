//! Authentication capability shared by every token strategy.

pub mod ports;

pub use ports::TokenProvider;
