//! Built-in health-check handler.
//!
//! Load balancers poll the health route every few seconds. Logging each of
//! those polls buries real traffic, so [`HEALTHCHECK_PATH`] is on the request
//! logger's default quiet list: successful checks are counted but produce no
//! plain-text lines. A failing check is still logged.
//!
//! ```rust,no_run
//! use reqlog::{Pipeline, Request, RequestLogger, Response, health};
//!
//! async fn app(req: Request) -> Response {
//!     match req.path() {
//!         health::HEALTHCHECK_PATH => Response::text("ok"),
//!         _ => Response::text("hello"),
//!     }
//! }
//!
//! let pipeline = Pipeline::new(app).layer(RequestLogger::new());
//! ```

use crate::{Request, Response};

/// The route exempt from routine request logging by default.
pub const HEALTHCHECK_PATH: &str = "/catalog/v1/healthcheck/";

/// Healthcheck handler. Always returns `200 OK` with body `"ok"`.
pub async fn healthcheck(_req: Request) -> Response {
    Response::text("ok")
}
