//! Diagnostic sink that forwards to `tracing`.

use crmbridge_core::logging::ports::DiagnosticSink;
use crmbridge_domain::LogLevel;
use serde_json::Value;

/// Target used for every diagnostic event, so it can be routed separately.
pub const DIAGNOSTICS_TARGET: &str = "crmbridge::diagnostics";

/// Writes log store diagnostics to the process tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&self, level: LogLevel, message: &str, context: &Value) {
        match level {
            LogLevel::Error => {
                tracing::error!(target: DIAGNOSTICS_TARGET, %context, "{message}");
            }
            LogLevel::Warning => {
                tracing::warn!(target: DIAGNOSTICS_TARGET, %context, "{message}");
            }
            LogLevel::Info => tracing::info!(target: DIAGNOSTICS_TARGET, %context, "{message}"),
            LogLevel::Debug => tracing::debug!(target: DIAGNOSTICS_TARGET, %context, "{message}"),
        }
    }
}
