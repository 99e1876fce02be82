//! Request logger configuration.
//!
//! [`RequestLogConfig`] is deserialized through the `config` crate, so the
//! same settings can come from a TOML/YAML/JSON file, `REQLOG__*`
//! environment variables, or both. Every field has a default; an empty
//! source yields the stock `info` / text / `web` logger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::Error;
use crate::health::HEALTHCHECK_PATH;

// ── LogFormat ─────────────────────────────────────────────────────────────────

/// Output formatter for structured events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable `key=value` pairs.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

// ── Environment ───────────────────────────────────────────────────────────────

/// Deployment environment. Only `Dev` gets structured started/completed
/// events; every environment gets the plain-text lines.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "development")]
    Dev,
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn is_dev(self) -> bool {
        self == Self::Dev
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev        => "dev",
            Self::Staging    => "staging",
            Self::Production => "production",
        }
    }
}

/// Case-insensitive; accepts `dev`/`development`, `staging`, `prod`/`production`.
impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Dev),
            "staging"             => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _                     => Err(Error::InvalidEnvironment(s.to_owned())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── EnvAccessor ───────────────────────────────────────────────────────────────

/// Source of the current deployment environment, consulted once per request.
pub trait EnvAccessor: Send + Sync {
    fn environment(&self) -> Environment;
}

impl EnvAccessor for Environment {
    fn environment(&self) -> Environment { *self }
}

/// Reads the environment from a process environment variable on every call.
///
/// Unset or unrecognised values fall back to `default`.
#[derive(Clone, Debug)]
pub struct EnvVar {
    key: String,
    default: Environment,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, default: Environment) -> Self {
        Self { key: key.into(), default }
    }
}

impl EnvAccessor for EnvVar {
    fn environment(&self) -> Environment {
        std::env::var(&self.key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.default)
    }
}

// ── RequestLogConfig ──────────────────────────────────────────────────────────

/// Settings for [`RequestLogger::from_config`](crate::RequestLogger::from_config).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestLogConfig {
    /// Minimum severity of structured events: `"trace"` … `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Namespace of the latency field, `measure#<name>.latency`.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    /// Request paths whose successful requests are not logged as plain text.
    /// Matched against the path only; query strings are ignored.
    #[serde(default = "default_quiet_paths")]
    pub quiet_paths: Vec<String>,
    /// Request headers copied into every event when present.
    #[serde(default = "default_correlation_headers")]
    pub correlation_headers: Vec<String>,
    /// DogStatsD agent `host:port`. Counters go to the `metrics` facade
    /// when unset.
    #[serde(default)]
    pub statsd_addr: Option<String>,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            name: default_name(),
            environment: Environment::default(),
            quiet_paths: default_quiet_paths(),
            correlation_headers: default_correlation_headers(),
            statsd_addr: None,
        }
    }
}

impl RequestLogConfig {
    /// Loads configuration from an optional file plus `REQLOG__*` variables.
    ///
    /// Environment variables win over the file. Lists are comma separated:
    /// `REQLOG__QUIET_PATHS=/healthz,/readyz`.
    pub fn load(file: Option<&str>) -> Result<Self, Error> {
        Self::load_with_prefix(file, "REQLOG")
    }

    /// [`load`](Self::load) reading `<prefix>__*` variables instead.
    pub fn load_with_prefix(file: Option<&str>, prefix: &str) -> Result<Self, Error> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(::config::File::with_name(path).required(false));
        }
        let config = builder
            .add_source(
                ::config::Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("quiet_paths")
                    .with_list_parse_key("correlation_headers")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// The configured level as a `tracing` level.
    pub fn level(&self) -> Result<Level, Error> {
        parse_level(&self.level)
    }
}

/// Parses `"trace"`, `"debug"`, `"info"`, `"warn"` or `"error"`, any case.
pub fn parse_level(s: &str) -> Result<Level, Error> {
    s.trim().parse().map_err(|_| Error::InvalidLevel(s.to_owned()))
}

fn default_level() -> String {
    "info".to_string()
}

fn default_name() -> String {
    "web".to_string()
}

fn default_quiet_paths() -> Vec<String> {
    vec![HEALTHCHECK_PATH.to_string()]
}

fn default_correlation_headers() -> Vec<String> {
    vec!["X-Request-Id".to_string(), "X-Trace-Id".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_logger() {
        let cfg = RequestLogConfig::default();
        assert_eq!(cfg.level().unwrap(), Level::INFO);
        assert_eq!(cfg.format, LogFormat::Text);
        assert_eq!(cfg.name, "web");
        assert_eq!(cfg.environment, Environment::Dev);
        assert_eq!(cfg.quiet_paths, ["/catalog/v1/healthcheck/"]);
        assert!(cfg.statsd_addr.is_none());
    }

    #[test]
    fn empty_document_deserializes_to_defaults() {
        let cfg: RequestLogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RequestLogConfig::default());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let cfg: RequestLogConfig = serde_json::from_str(
            r#"{"format":"json","name":"catalog","environment":"prod","level":"WARN"}"#,
        )
        .unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.name, "catalog");
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.level().unwrap(), Level::WARN);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let cfg = RequestLogConfig { level: "loud".into(), ..Default::default() };
        assert!(matches!(cfg.level(), Err(Error::InvalidLevel(l)) if l == "loud"));
    }

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn env_var_accessor_falls_back_when_unset() {
        let accessor = EnvVar::new("REQLOG_TEST_SURELY_UNSET_ENV", Environment::Staging);
        assert_eq!(accessor.environment(), Environment::Staging);
    }

    #[test]
    fn env_var_accessor_reads_variable_on_each_call() {
        let key = "REQLOG_TEST_ACCESSOR_ENV";
        let accessor = EnvVar::new(key, Environment::Dev);

        // SAFETY: the key is unique to this test.
        unsafe { std::env::set_var(key, "PROD") };
        assert_eq!(accessor.environment(), Environment::Production);

        unsafe { std::env::set_var(key, "qa") };
        assert_eq!(accessor.environment(), Environment::Dev);

        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn load_merges_prefixed_environment_variables() {
        let vars = [
            ("REQLOGTESTLOAD__QUIET_PATHS", "/healthz,/readyz"),
            ("REQLOGTESTLOAD__CORRELATION_HEADERS", "X-Request-Id"),
            ("REQLOGTESTLOAD__ENVIRONMENT", "production"),
            ("REQLOGTESTLOAD__NAME", "catalog"),
            ("REQLOGTESTLOAD__FORMAT", "json"),
        ];
        // SAFETY: the prefix is unique to this test.
        for (k, v) in vars {
            unsafe { std::env::set_var(k, v) };
        }

        let cfg = RequestLogConfig::load_with_prefix(None, "REQLOGTESTLOAD");

        for (k, _) in vars {
            unsafe { std::env::remove_var(k) };
        }
        let cfg = cfg.unwrap();
        assert_eq!(cfg.quiet_paths, ["/healthz", "/readyz"]);
        assert_eq!(cfg.correlation_headers, ["X-Request-Id"]);
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.name, "catalog");
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level, "info");
    }

    #[test]
    fn load_without_sources_yields_defaults() {
        let cfg = RequestLogConfig::load_with_prefix(None, "REQLOGTESTNOTHINGSET").unwrap();
        assert_eq!(cfg, RequestLogConfig::default());
    }
}
