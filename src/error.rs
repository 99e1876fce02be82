//! Unified error type.

use thiserror::Error;

/// The error type returned by reqlog's fallible operations.
///
/// Request outcomes (404, 500, etc.) are never expressed as `Error`s: the
/// middleware only observes them. This type surfaces setup and sink
/// failures: loading configuration, installing the global subscriber, or a
/// metrics datagram that could not be sent.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid log level `{0}`")]
    InvalidLevel(String),

    #[error("invalid environment `{0}`")]
    InvalidEnvironment(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics sink: {0}")]
    Sink(String),

    #[error("logging: {0}")]
    Logging(String),
}
