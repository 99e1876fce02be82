//! Request logging and latency middleware.
//!
//! For every request [`RequestLogger`] emits a "started" event before the
//! downstream handler runs and a "completed" event after it returns, bumps a
//! `<status>_requests` counter, and writes a plain-text completion line
//! whose severity follows the status:
//!
//! | Status | Plain-text severity |
//! |---|---|
//! | 200 | [`Severity::Info`] |
//! | 500 | [`Severity::Error`] |
//! | anything else | [`Severity::Alert`] |
//!
//! Structured events (method, request URI, remote address, status, latency,
//! correlation headers) go to the [`StructuredLogger`] only when the
//! environment accessor reports [`Environment::Dev`]. Quiet paths (the health
//! check by default) skip the plain-text started line and the plain-text
//! completed line for `200`; a failing healthcheck is still reported.
//!
//! The middleware is a pure observer: it never changes the response, never
//! times out the handler, and never lets a sink failure reach the caller.
//! A panicking handler unwinds straight through it, with nothing logged.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use serde_json::Value;
use tracing::{Level, warn};

use super::{Middleware, Next};
use crate::config::{EnvAccessor, Environment, LogFormat, RequestLogConfig};
use crate::error::Error;
use crate::fields::Fields;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::{ObserveStatus, Response};
use crate::sink::{
    AlertSink, CounterSink, MetricsCounter, Severity, StatsdCounter, StructuredLogger,
    TracingAlertSink, TracingLogger,
};

const STARTED: &str = "started handling request";
const COMPLETED: &str = "completed handling request";

// ── Per-call snapshots ────────────────────────────────────────────────────────

/// What the logger knows about a request, captured before the handler runs.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    pub method: String,
    pub request_uri: String,
    pub path: String,
    pub remote: String,
    /// `(configured header name, value)` for each correlation header present.
    pub correlation: Vec<(String, String)>,
}

impl RequestContext {
    pub fn capture(req: &Request, correlation_headers: &[String]) -> Self {
        let correlation = correlation_headers
            .iter()
            .filter_map(|name| {
                req.headers()
                    .get(name.as_str())
                    .map(|v| (name.clone(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            })
            .collect();

        Self {
            method: req.method().to_string(),
            request_uri: req.request_uri().to_owned(),
            path: req.path().to_owned(),
            remote: req.remote_addr().to_owned(),
            correlation,
        }
    }
}

/// What the logger learns once the handler has returned.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseOutcome {
    pub status: StatusCode,
    pub latency: Duration,
}

impl ResponseOutcome {
    pub fn observe(response: &impl ObserveStatus, latency: Duration) -> Self {
        Self { status: response.observed_status(), latency }
    }

    /// Reason phrase, empty for unregistered codes.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn latency_nanos(&self) -> u64 {
        u64::try_from(self.latency.as_nanos()).unwrap_or(u64::MAX)
    }

    /// Human-readable latency, e.g. `5.012ms`.
    pub fn took(&self) -> String {
        format!("{:?}", self.latency)
    }

    pub fn severity(&self) -> Severity {
        Severity::for_status(self.status)
    }
}

// ── RequestLogger ─────────────────────────────────────────────────────────────

/// Logs each request/response cycle and measures its latency.
///
/// Created once at startup and immutable afterwards. Every collaborator is
/// injected, so tests can swap in the [`memory`](crate::memory) sinks:
///
/// ```rust
/// use reqlog::{Environment, Pipeline, Request, RequestLogger, Response};
/// use reqlog::memory::{MemoryAlerts, MemoryCounter};
///
/// let counter = MemoryCounter::new();
/// let pipeline = Pipeline::new(|_req: Request| async { Response::text("ok") })
///     .layer(
///         RequestLogger::new()
///             .with_environment(Environment::Production)
///             .with_alert_sink(MemoryAlerts::new())
///             .with_counter(counter.clone()),
///     );
/// ```
pub struct RequestLogger {
    name: String,
    latency_field: String,
    logger: Arc<dyn StructuredLogger>,
    alerts: Arc<dyn AlertSink>,
    counter: Arc<dyn CounterSink>,
    env: Arc<dyn EnvAccessor>,
    quiet_paths: Vec<String>,
    correlation_headers: Vec<String>,
}

impl RequestLogger {
    /// Info level, text output, namespace `web`.
    pub fn new() -> Self {
        Self::custom(Level::INFO, LogFormat::Text, "web")
    }

    /// Builds a logger whose structured events are filtered at `level` and
    /// rendered as `format`, with latency reported as `measure#<name>.latency`.
    pub fn custom(level: Level, format: LogFormat, name: impl Into<String>) -> Self {
        let defaults = RequestLogConfig::default();
        let name = name.into();
        Self {
            latency_field: format!("measure#{name}.latency"),
            name,
            logger: Arc::new(TracingLogger::new(level, format)),
            alerts: Arc::new(TracingAlertSink),
            counter: Arc::new(MetricsCounter::new()),
            env: Arc::new(defaults.environment),
            quiet_paths: defaults.quiet_paths,
            correlation_headers: defaults.correlation_headers,
        }
    }

    /// Builds a logger from loaded configuration. A `statsd_addr` wires a
    /// [`StatsdCounter`]; otherwise counters go to the `metrics` facade.
    pub fn from_config(config: &RequestLogConfig) -> Result<Self, Error> {
        let mut logger = Self::custom(config.level()?, config.format, config.name.clone())
            .with_environment(config.environment);
        logger.quiet_paths = config.quiet_paths.clone();
        logger.correlation_headers = config.correlation_headers.clone();
        if let Some(addr) = &config.statsd_addr {
            logger = logger.with_counter(StatsdCounter::connect(addr.as_str())?);
        }
        Ok(logger)
    }

    pub fn with_logger(mut self, logger: impl StructuredLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_alert_sink(mut self, alerts: impl AlertSink + 'static) -> Self {
        self.alerts = Arc::new(alerts);
        self
    }

    pub fn with_counter(mut self, counter: impl CounterSink + 'static) -> Self {
        self.counter = Arc::new(counter);
        self
    }

    pub fn with_environment(mut self, env: impl EnvAccessor + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Adds a path whose routine traffic is not logged as plain text.
    ///
    /// Matching is on the path alone; the query string is ignored, so
    /// `/healthz?verbose=1` is quiet when `/healthz` is.
    pub fn quiet_path(mut self, path: impl Into<String>) -> Self {
        self.quiet_paths.push(path.into());
        self
    }

    /// Adds a header copied into every event when present.
    pub fn correlation_header(mut self, name: impl Into<String>) -> Self {
        self.correlation_headers.push(name.into());
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn logger(&self) -> &Arc<dyn StructuredLogger> { &self.logger }
    pub fn quiet_paths(&self) -> &[String] { &self.quiet_paths }
    pub fn correlation_headers(&self) -> &[String] { &self.correlation_headers }

    fn is_quiet(&self, path: &str) -> bool {
        self.quiet_paths.iter().any(|p| p == path)
    }

    async fn observe(&self, req: Request, next: Next) -> Response {
        let start = Instant::now();
        let env = self.env.environment();
        let ctx = RequestContext::capture(&req, &self.correlation_headers);
        let quiet = self.is_quiet(&ctx.path);

        self.started(&ctx, env, quiet);

        let response = next.run(req).await;
        let outcome = ResponseOutcome::observe(&response, start.elapsed());

        self.completed(&ctx, &outcome, env, quiet);
        response
    }

    fn started(&self, ctx: &RequestContext, env: Environment, quiet: bool) {
        if env.is_dev() {
            let mut fields = Fields::new()
                .with("method", ctx.method.as_str())
                .with("request", ctx.request_uri.as_str())
                .with("remote", ctx.remote.as_str());
            push_correlation(&mut fields, ctx);
            self.logger.log(Level::INFO, &fields, STARTED);
        }

        if !quiet {
            let mut line = format!(
                "{STARTED}: method={} remote={} request={}",
                ctx.method, ctx.remote, ctx.request_uri,
            );
            push_correlation_text(&mut line, ctx);
            self.alerts.emit(Severity::Info, &line);
        }
    }

    fn completed(&self, ctx: &RequestContext, outcome: &ResponseOutcome, env: Environment, quiet: bool) {
        let took = outcome.took();

        if env.is_dev() {
            let mut fields = Fields::new()
                .with("status", outcome.status.as_u16())
                .with("method", ctx.method.as_str())
                .with("request", ctx.request_uri.as_str())
                .with("remote", ctx.remote.as_str())
                .with("text_status", outcome.status_text())
                .with("took", took.as_str())
                .with(self.latency_field.as_str(), Value::from(outcome.latency_nanos()));
            push_correlation(&mut fields, ctx);
            self.logger.log(Level::INFO, &fields, COMPLETED);
        }

        let metric = format!("{}_requests", outcome.status.as_u16());
        if let Err(e) = self.counter.count(&metric, 1) {
            warn!(metric = %metric, error = %e, "request counter not recorded");
        }

        let severity = outcome.severity();
        if quiet && severity == Severity::Info {
            return;
        }

        let mut line = format!(
            "{COMPLETED}: {}={} method={} remote={} request={} status={} text_status={} took={}",
            self.latency_field,
            outcome.latency_nanos(),
            ctx.method,
            ctx.remote,
            ctx.request_uri,
            outcome.status.as_u16(),
            outcome.status_text(),
            took,
        );
        push_correlation_text(&mut line, ctx);
        self.alerts.emit(severity, &line);
    }
}

impl Default for RequestLogger {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestLogger {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin(self.observe(req, next))
    }
}

fn push_correlation(fields: &mut Fields, ctx: &RequestContext) {
    for (name, value) in &ctx.correlation {
        fields.insert(name.as_str(), value.as_str());
    }
}

fn push_correlation_text(line: &mut String, ctx: &RequestContext) {
    for (name, value) in &ctx.correlation {
        let _ = write!(line, " {name}={value}");
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderValue, Method};

    use super::*;
    use crate::memory::{MemoryAlerts, MemoryCounter, MemoryLogger};
    use crate::middleware::Pipeline;

    struct Harness {
        logger: MemoryLogger,
        alerts: MemoryAlerts,
        counter: MemoryCounter,
    }

    impl Harness {
        fn new() -> Self {
            Self { logger: MemoryLogger::new(), alerts: MemoryAlerts::new(), counter: MemoryCounter::new() }
        }

        fn middleware(&self, env: Environment) -> RequestLogger {
            RequestLogger::new()
                .with_logger(self.logger.clone())
                .with_alert_sink(self.alerts.clone())
                .with_counter(self.counter.clone())
                .with_environment(env)
        }
    }

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        Request::new(builder.body(Bytes::new()).unwrap(), "10.0.0.5")
    }

    fn answering(status: StatusCode) -> Pipeline {
        Pipeline::new(move |_req: Request| async move { Response::status(status) })
    }

    struct BrokenCounter;

    impl CounterSink for BrokenCounter {
        fn count(&self, _name: &str, _value: u64) -> Result<(), Error> {
            Err(Error::Sink("agent unreachable".into()))
        }
    }

    #[tokio::test]
    async fn severity_follows_status() {
        for (code, expected) in [
            (StatusCode::OK, Severity::Info),
            (StatusCode::INTERNAL_SERVER_ERROR, Severity::Error),
            (StatusCode::NOT_FOUND, Severity::Alert),
            (StatusCode::MOVED_PERMANENTLY, Severity::Alert),
            (StatusCode::SERVICE_UNAVAILABLE, Severity::Alert),
        ] {
            let h = Harness::new();
            let pipeline = answering(code).layer(h.middleware(Environment::Production));

            pipeline.call(request(Method::GET, "/items", &[])).await;

            let completed = h.alerts.starting_with(COMPLETED);
            assert_eq!(completed.len(), 1, "status {code}");
            assert_eq!(completed[0].0, expected, "status {code}");
        }
    }

    #[tokio::test]
    async fn structured_events_carry_request_fields() {
        let h = Harness::new();
        let pipeline = answering(StatusCode::OK).layer(h.middleware(Environment::Dev));

        pipeline
            .call(request(Method::POST, "/items?draft=1", &[("x-request-id", "abc123")]))
            .await;

        let started = h.logger.with_message(STARTED);
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].level, Level::INFO);
        assert_eq!(
            started[0].fields.keys().collect::<Vec<_>>(),
            ["method", "request", "remote", "X-Request-Id"],
        );
        assert_eq!(started[0].fields.get_str("request"), Some("/items?draft=1"));

        let completed = h.logger.with_message(COMPLETED);
        assert_eq!(completed.len(), 1);
        let fields = &completed[0].fields;
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            ["status", "method", "request", "remote", "text_status", "took", "measure#web.latency", "X-Request-Id"],
        );
        assert_eq!(fields.get("status"), Some(&Value::from(200)));
        assert_eq!(fields.get_str("text_status"), Some("OK"));
        assert_eq!(fields.get_str("method"), Some("POST"));
        assert!(fields.get("measure#web.latency").and_then(Value::as_u64).is_some());
    }

    #[tokio::test]
    async fn production_skips_structured_events_only() {
        let h = Harness::new();
        let pipeline = answering(StatusCode::OK).layer(h.middleware(Environment::Production));

        pipeline.call(request(Method::GET, "/items/1", &[])).await;

        assert!(h.logger.records().is_empty());
        assert_eq!(h.alerts.lines().len(), 2);
        assert_eq!(h.counter.total("200_requests"), 1);
    }

    #[tokio::test]
    async fn counter_failure_does_not_reach_caller() {
        let h = Harness::new();
        let pipeline = answering(StatusCode::CREATED)
            .layer(h.middleware(Environment::Dev).with_counter(BrokenCounter));

        let res = pipeline.call(request(Method::PUT, "/items/9", &[])).await;

        assert_eq!(res.observed_status(), StatusCode::CREATED);
        assert_eq!(h.alerts.starting_with(COMPLETED).len(), 1);
    }

    #[tokio::test]
    async fn custom_name_drives_latency_field() {
        let h = Harness::new();
        let middleware = RequestLogger::custom(Level::DEBUG, LogFormat::Json, "catalog")
            .with_logger(h.logger.clone())
            .with_alert_sink(h.alerts.clone())
            .with_counter(h.counter.clone());
        assert_eq!(middleware.name(), "catalog");
        let pipeline = answering(StatusCode::OK).layer(middleware);

        pipeline.call(request(Method::GET, "/", &[])).await;

        let completed = h.logger.with_message(COMPLETED);
        assert!(completed[0].fields.get("measure#catalog.latency").is_some());
        let lines = h.alerts.starting_with(COMPLETED);
        let (_, line) = &lines[0];
        assert!(line.starts_with("completed handling request: measure#catalog.latency="));
    }

    #[tokio::test]
    async fn extra_quiet_path_and_correlation_header() {
        let h = Harness::new();
        let pipeline = answering(StatusCode::OK).layer(
            h.middleware(Environment::Production)
                .quiet_path("/readyz")
                .correlation_header("X-Session"),
        );

        pipeline.call(request(Method::GET, "/readyz", &[("x-session", "s-1")])).await;
        pipeline.call(request(Method::GET, "/items", &[("x-session", "s-2")])).await;

        let lines = h.alerts.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|(_, l)| l.contains("request=/items")));
        assert!(lines.iter().all(|(_, l)| l.ends_with("X-Session=s-2")));
        assert_eq!(h.counter.total("200_requests"), 2);
    }

    #[tokio::test]
    async fn quiet_path_ignores_query_string() {
        let h = Harness::new();
        let pipeline = answering(StatusCode::OK).layer(h.middleware(Environment::Production));

        pipeline.call(request(Method::GET, "/catalog/v1/healthcheck/?x=1", &[])).await;

        assert!(h.alerts.lines().is_empty());
        assert_eq!(h.counter.total("200_requests"), 1);
    }

    #[test]
    fn capture_decodes_non_utf8_header_lossily() {
        let mut req = http::Request::builder()
            .uri("/items")
            .body(Bytes::new())
            .unwrap();
        req.headers_mut()
            .insert("x-request-id", HeaderValue::from_bytes(b"ab\xffc").unwrap());
        let req = Request::new(req, "10.0.0.5");

        let ctx = RequestContext::capture(&req, &["X-Request-Id".to_string()]);

        assert_eq!(ctx.correlation, [("X-Request-Id".to_string(), "ab\u{FFFD}c".to_string())]);
    }

    #[test]
    fn outcome_reports_unknown_status_without_text() {
        let res = Response::status(StatusCode::from_u16(599).unwrap());
        let outcome = ResponseOutcome::observe(&res, Duration::from_millis(5));

        assert_eq!(outcome.status_text(), "");
        assert_eq!(outcome.latency_nanos(), 5_000_000);
        assert_eq!(outcome.took(), "5ms");
        assert_eq!(outcome.severity(), Severity::Alert);
    }

    #[test]
    fn from_config_applies_settings() {
        let config = RequestLogConfig {
            name: "api".into(),
            quiet_paths: vec!["/ping".into()],
            correlation_headers: vec!["X-Correlation-Id".into()],
            ..Default::default()
        };

        let logger = RequestLogger::from_config(&config).unwrap();

        assert_eq!(logger.name(), "api");
        assert_eq!(logger.quiet_paths(), ["/ping"]);
        assert_eq!(logger.correlation_headers(), ["X-Correlation-Id"]);
    }

    #[test]
    fn from_config_rejects_bad_level() {
        let config = RequestLogConfig { level: "verbose".into(), ..Default::default() };
        assert!(matches!(RequestLogger::from_config(&config), Err(Error::InvalidLevel(_))));
    }
}
