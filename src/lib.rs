//! # reqlog
//!
//! Request logging and latency measurement for hyper-based HTTP services.
//! It is observability glue and nothing else.
//!
//! ## The contract
//!
//! [`RequestLogger`] sits in front of your handler. For every request it:
//!
//! 1. emits a *started* event (method, request URI, remote address,
//!    correlation headers);
//! 2. runs the downstream handler exactly once;
//! 3. emits a *completed* event with status, status text, and latency, both
//!    human-readable and as `measure#<name>.latency` nanoseconds;
//! 4. increments the `<status>_requests` counter;
//! 5. writes a plain-text completion line at info (200), error (500), or
//!    alert (anything else) severity.
//!
//! What it intentionally leaves to others:
//!
//! - **Serving HTTP**: your accept loop, via [`service::dispatch`]
//! - **Routing**: your handler
//! - **Log storage and metric aggregation**: whatever sits behind the
//!   [`sink`] traits
//! - **Panic recovery**: an outer layer; a panicking handler unwinds
//!   through the logger without a completed event
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use reqlog::{Pipeline, Request, RequestLogger, Response, health};
//! use http::StatusCode;
//!
//! async fn app(req: Request) -> Response {
//!     match req.path() {
//!         health::HEALTHCHECK_PATH => Response::text("ok"),
//!         "/broken" => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
//!         _ => Response::json(br#"{"id":42}"#.to_vec()),
//!     }
//! }
//!
//! # async fn run() -> Result<(), reqlog::Error> {
//! let config = reqlog::RequestLogConfig::load(Some("config/reqlog"))?;
//! reqlog::logging::init_from_config(&config)?;
//!
//! let pipeline = Pipeline::new(app).layer(RequestLogger::from_config(&config)?);
//! # Ok(())
//! # }
//! ```

mod error;
mod fields;
mod handler;
mod request;
mod response;

pub mod config;
pub mod health;
pub mod logging;
pub mod memory;
pub mod middleware;
pub mod service;
pub mod sink;

pub use crate::config::{EnvAccessor, EnvVar, Environment, LogFormat, RequestLogConfig};
pub use error::Error;
pub use fields::Fields;
pub use handler::{BoxFuture, Handler};
pub use middleware::{Middleware, Next, Pipeline, RequestContext, RequestLogger, ResponseOutcome};
pub use request::Request;
pub use response::{IntoResponse, ObserveStatus, Response, ResponseBuilder};
pub use sink::{AlertSink, CounterSink, Severity, StructuredLogger};
