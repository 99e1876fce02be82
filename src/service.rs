//! hyper adapter.
//!
//! reqlog does not own a server. Hosts keep their own accept loop and call
//! [`dispatch`] from a hyper `service_fn`, once per request:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hyper::service::service_fn;
//! use hyper_util::rt::{TokioExecutor, TokioIo};
//! use hyper_util::server::conn::auto::Builder;
//! use reqlog::{Pipeline, Request, RequestLogger, Response, service};
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let pipeline = Arc::new(
//!     Pipeline::new(|_req: Request| async { Response::text("ok") })
//!         .layer(RequestLogger::new()),
//! );
//! let listener = TcpListener::bind("0.0.0.0:3000").await?;
//! loop {
//!     let (stream, peer) = listener.accept().await?;
//!     let pipeline = Arc::clone(&pipeline);
//!     tokio::spawn(async move {
//!         let svc = service_fn(move |req| service::dispatch(Arc::clone(&pipeline), req, peer));
//!         let _ = Builder::new(TokioExecutor::new())
//!             .serve_connection(TokioIo::new(stream), svc)
//!             .await;
//!     });
//! }
//! # }
//! ```

use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use tracing::warn;

use crate::middleware::Pipeline;
use crate::request::Request;
use crate::response::Response;

/// Runs one hyper request through `pipeline`.
///
/// The body is collected up front; a body that fails mid-stream is answered
/// with `400 Bad Request` without entering the pipeline. The error type is
/// [`Infallible`], so hyper never sees an error from here.
pub async fn dispatch<B>(
    pipeline: Arc<Pipeline>,
    req: http::Request<B>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, uri = %parts.uri, "request body read failed: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let req = Request::from_parts(parts, body, remote_addr.to_string());
    Ok(pipeline.call(req).await.into_inner())
}
