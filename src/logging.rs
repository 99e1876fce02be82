//! Process-wide `tracing` subscriber.
//!
//! The request logger's default sinks write through `tracing`, so something
//! has to print those events. Call [`init`] once at startup, before the
//! first request; `RUST_LOG` overrides the configured level.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, RequestLogConfig};
use crate::error::Error;

/// Installs a `fmt` subscriber at `level` in `format`.
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init(level: &str, format: LogFormat) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|_| Error::InvalidLevel(level.to_owned()))?;

    let installed = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    installed.map_err(|e| Error::Logging(e.to_string()))
}

/// [`init`] with the level and format of a loaded configuration.
pub fn init_from_config(config: &RequestLogConfig) -> Result<(), Error> {
    init(&config.level, config.format)
}
