//! In-memory sinks that record every call.
//!
//! Handy in tests and for inspecting what the request logger emits. Clones
//! share one buffer, so keep a clone and hand the other to the logger:
//!
//! ```rust
//! use reqlog::RequestLogger;
//! use reqlog::memory::MemoryCounter;
//!
//! let counter = MemoryCounter::new();
//! let logger = RequestLogger::new().with_counter(counter.clone());
//! assert!(counter.calls().is_empty());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;

use crate::error::Error;
use crate::fields::Fields;
use crate::sink::{AlertSink, CounterSink, Severity, StructuredLogger};

/// One structured event.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub fields: Fields,
    pub message: String,
}

/// Records structured events.
#[derive(Clone, Debug, Default)]
pub struct MemoryLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records whose message equals `message`.
    pub fn with_message(&self, message: &str) -> Vec<LogRecord> {
        self.records.lock().iter().filter(|r| r.message == message).cloned().collect()
    }
}

impl StructuredLogger for MemoryLogger {
    fn log(&self, level: Level, fields: &Fields, message: &str) {
        self.records.lock().push(LogRecord {
            level,
            fields: fields.clone(),
            message: message.to_owned(),
        });
    }
}

/// Records plain-text lines with their severity.
#[derive(Clone, Debug, Default)]
pub struct MemoryAlerts {
    lines: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl MemoryAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().clone()
    }

    /// Lines whose text starts with `prefix`.
    pub fn starting_with(&self, prefix: &str) -> Vec<(Severity, String)> {
        self.lines.lock().iter().filter(|(_, l)| l.starts_with(prefix)).cloned().collect()
    }
}

impl AlertSink for MemoryAlerts {
    fn emit(&self, severity: Severity, message: &str) {
        self.lines.lock().push((severity, message.to_owned()));
    }
}

/// Records counter increments in call order.
#[derive(Clone, Debug, Default)]
pub struct MemoryCounter {
    calls: Arc<Mutex<Vec<(String, u64)>>>,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, u64)> {
        self.calls.lock().clone()
    }

    /// Sum of all increments recorded under `name`.
    pub fn total(&self, name: &str) -> u64 {
        self.calls.lock().iter().filter(|(n, _)| n == name).map(|(_, v)| v).sum()
    }
}

impl CounterSink for MemoryCounter {
    fn count(&self, name: &str, value: u64) -> Result<(), Error> {
        self.calls.lock().push((name.to_owned(), value));
        Ok(())
    }
}
