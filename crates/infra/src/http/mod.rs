//! Shared HTTP client used by the CRM integrations.

mod client;

pub use client::{HttpClient, HttpClientBuilder};
