//! `tracing`-backed log sinks.
//!
//! `tracing` field names are fixed at compile time, so the well-known request
//! fields (`method`, `request`, `remote`, `status`, `text_status`, `took`)
//! are recorded as real event fields, with the latency nanoseconds as
//! `latency_ns`. Only the names known at runtime (correlation headers,
//! `measure#<name>.latency`) are rendered by the logger's own [`LogFormat`]
//! into a single `extra` value.

use serde_json::Value;
use tracing::{Level, error, event, info};

use super::{AlertSink, Severity, StructuredLogger};
use crate::config::LogFormat;
use crate::fields::Fields;

/// Field names recorded as typed `tracing` fields instead of in `extra`.
const TYPED_FIELDS: [&str; 6] = ["method", "request", "remote", "status", "text_status", "took"];

/// Structured logger with its own minimum level and output format.
#[derive(Clone, Debug)]
pub struct TracingLogger {
    level: Level,
    format: LogFormat,
}

impl TracingLogger {
    pub fn new(level: Level, format: LogFormat) -> Self {
        Self { level, format }
    }

    pub fn level(&self) -> Level { self.level }
    pub fn format(&self) -> LogFormat { self.format }

    /// `tracing` orders levels by verbosity: `TRACE` is the greatest.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new(Level::INFO, LogFormat::Text)
    }
}

impl StructuredLogger for TracingLogger {
    fn log(&self, level: Level, fields: &Fields, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let method = fields.get_str("method");
        let request = fields.get_str("request");
        let remote = fields.get_str("remote");
        let status = fields.get("status").and_then(Value::as_u64);
        let text_status = fields.get_str("text_status");
        let took = fields.get_str("took");
        let latency_ns = fields
            .iter()
            .find(|(k, _)| is_latency_key(k))
            .and_then(|(_, v)| v.as_u64());

        let extra: Fields = fields
            .iter()
            .filter(|(k, _)| !TYPED_FIELDS.contains(k))
            .map(|(k, v)| (k, v.clone()))
            .collect();
        let extra = (!extra.is_empty()).then(|| extra.render(self.format));
        let extra = extra.as_deref();

        // `event!` needs a constant level. Absent fields are `None` and
        // are left out of the event.
        macro_rules! emit {
            ($level:expr) => {
                event!(
                    target: "reqlog",
                    $level,
                    method,
                    request,
                    remote,
                    status,
                    text_status,
                    took,
                    latency_ns,
                    extra,
                    "{message}"
                )
            };
        }

        match level {
            Level::ERROR => emit!(Level::ERROR),
            Level::WARN  => emit!(Level::WARN),
            Level::INFO  => emit!(Level::INFO),
            Level::DEBUG => emit!(Level::DEBUG),
            _            => emit!(Level::TRACE),
        }
    }
}

/// `measure#<name>.latency`
fn is_latency_key(key: &str) -> bool {
    key.starts_with("measure#") && key.ends_with(".latency")
}

/// Plain-text sink writing through `tracing`. `Alert` lines are error
/// events tagged `alert = true` so they can be routed separately.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info  => info!(target: "reqlog", "{message}"),
            Severity::Error => error!(target: "reqlog", "{message}"),
            Severity::Alert => error!(target: "reqlog", alert = true, "{message}"),
        }
    }
}
