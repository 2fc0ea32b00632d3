//! Shared utilities for CRM Bridge crates.
//!
//! - [`time`]: clock abstraction so token expiry and log retention can be
//!   tested without waiting
//! - [`auth`]: OAuth 2.0 wire types and PKCE helpers shared by both token
//!   strategies

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod time;

pub use time::{Clock, MockClock, SystemClock};
