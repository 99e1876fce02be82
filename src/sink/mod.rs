//! Collaborators the request logger writes to.
//!
//! | Trait | Receives | Shipped implementation |
//! |---|---|---|
//! | [`StructuredLogger`] | level + [`Fields`] + message | [`TracingLogger`] |
//! | [`AlertSink`] | [`Severity`] + plain message | [`TracingAlertSink`] |
//! | [`CounterSink`] | metric name + increment | [`MetricsCounter`], [`StatsdCounter`] |
//!
//! All three are shared by every in-flight request, hence `Send + Sync`.
//! None of them may block for long: they run on the request path, after the
//! downstream handler has returned and before the response goes out.

mod counter;
mod log;

use std::fmt;

use http::StatusCode;
use tracing::Level;

use crate::error::Error;
use crate::fields::Fields;

pub use counter::{MetricsCounter, StatsdCounter};
pub use log::{TracingAlertSink, TracingLogger};

/// Receives structured events.
pub trait StructuredLogger: Send + Sync {
    fn log(&self, level: Level, fields: &Fields, message: &str);
}

/// Receives plain-text lines at a [`Severity`].
pub trait AlertSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);
}

/// Receives counter increments.
///
/// Errors are reported to the caller, which decides whether they matter.
/// The request logger logs and drops them.
pub trait CounterSink: Send + Sync {
    fn count(&self, name: &str, value: u64) -> Result<(), Error>;
}

/// Severity of a plain-text line, ordered from least to most urgent.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Severity {
    Info,
    Error,
    /// Anomalous but not a crash: anything other than 200 or 500.
    Alert,
}

impl Severity {
    /// Classifies a response status for the completed line.
    ///
    /// Only the exact codes 200 and 500 have their own tier; 201, 404, 503
    /// and friends are all `Alert`.
    pub fn for_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK                    => Self::Info,
            StatusCode::INTERNAL_SERVER_ERROR => Self::Error,
            _                                 => Self::Alert,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info  => "info",
            Self::Error => "error",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
