//! Process-level tracing setup and the diagnostic sink for the log store.

pub mod diagnostics;

use crmbridge_domain::{CrmBridgeError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use diagnostics::TracingDiagnosticSink;

/// Build the `EnvFilter`, letting `RUST_LOG` override the configured directive.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }

    EnvFilter::try_new(&config.filter).map_err(|e| {
        CrmBridgeError::Configuration(format!("invalid log filter '{}': {e}", config.filter))
    })
}

/// Install the global tracing subscriber: a plain or JSON `fmt` layer.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;

    let layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_target(true).with_filter(filter).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| CrmBridgeError::Internal(format!("tracing already initialised: {e}")))?;

    tracing::debug!(filter = %config.filter, json = config.json, "tracing initialised");
    Ok(())
}
