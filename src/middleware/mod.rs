//! Middleware layer.
//!
//! Middleware intercepts a request on its way to the downstream handler and
//! sees the response on its way back. It is the place for cross-cutting
//! concerns: request logging, latency measurement, metrics.
//!
//! A [`Pipeline`] is an ordered list of middleware ending in one
//! [`Handler`]. Each middleware receives the request plus a [`Next`]
//! continuation for the rest of the chain:
//!
//! ```text
//! Pipeline::new(app).layer(a).layer(b)
//!
//!   request ──► a ──► b ──► app
//!   response ◄── a ◄── b ◄──┘
//! ```
//!
//! `Next::run` takes `self`, so a middleware can hand the request on at
//! most once. Not calling it at all short-circuits the chain.

mod request_log;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

pub use request_log::{RequestContext, RequestLogger, ResponseOutcome};

/// A link in a [`Pipeline`].
///
/// Implementations box their future; the borrow of `self` lets them use
/// their own state without cloning it per request:
///
/// ```rust
/// use reqlog::{BoxFuture, Middleware, Next, Request};
///
/// struct Noop;
///
/// impl Middleware for Noop {
///     fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
///         Box::pin(next.run(req))
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a>;
}

type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current middleware.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    /// Runs the rest of the chain and the downstream handler.
    pub async fn run(self, req: Request) -> Response {
        match self.chain.get(self.index).cloned() {
            Some(middleware) => {
                let next = Next { index: self.index + 1, ..self };
                middleware.handle(req, next).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

/// Ordered middleware chain plus the downstream handler.
///
/// Build it once at startup, wrap it in an `Arc`, and share it across
/// connections. Middleware added first runs outermost.
pub struct Pipeline {
    chain: Arc<[BoxedMiddleware]>,
    endpoint: BoxedHandler,
}

impl Pipeline {
    pub fn new(handler: impl Handler) -> Self {
        Self { chain: Arc::from(Vec::new()), endpoint: handler.into_boxed_handler() }
    }

    /// Appends `middleware` inside every middleware added before it.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut chain = self.chain.to_vec();
        chain.push(Arc::new(middleware));
        self.chain = chain.into();
        self
    }

    pub fn len(&self) -> usize { self.chain.len() }
    pub fn is_empty(&self) -> bool { self.chain.is_empty() }

    /// Sends one request through the chain.
    pub async fn call(&self, req: Request) -> Response {
        let next = Next {
            chain: Arc::clone(&self.chain),
            index: 0,
            endpoint: Arc::clone(&self.endpoint),
        };
        next.run(req).await
    }
}
