//! Minimal reqlog demo: a hand-routed item API behind the request logger.
//!
//! Run with:
//!   REQLOG__ENVIRONMENT=dev cargo run --example basic
//!
//! Try:
//!   curl -H 'X-Request-Id: abc123' http://localhost:3000/items/42
//!   curl http://localhost:3000/broken
//!   curl http://localhost:3000/missing
//!   curl http://localhost:3000/catalog/v1/healthcheck/
//!
//! The health check is counted but not logged as plain text.
//!
//! # Shutdown
//!
//! On SIGTERM (what Kubernetes sends before `terminationGracePeriodSeconds`
//! runs out) or Ctrl-C the demo stops accepting connections, lets every
//! in-flight connection finish, and only then exits. Each drained request
//! still gets its completed line and counter increment.

use std::net::SocketAddr;
use std::sync::Arc;

use http::StatusCode;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use reqlog::{Pipeline, Request, RequestLogConfig, RequestLogger, Response, health, service};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), reqlog::Error> {
    let config = RequestLogConfig::load(None)?;
    reqlog::logging::init_from_config(&config)?;

    // One pipeline shared by every connection task; cloning the `Arc` does
    // not copy the middleware chain.
    let pipeline = Arc::new(Pipeline::new(app).layer(RequestLogger::from_config(&config)?));

    let addr: SocketAddr = ([0, 0, 0, 0], 3000).into();
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, env = %config.environment, "demo listening");

    // Every connection task lives in the JoinSet so shutdown can wait on it.
    let mut tasks = tokio::task::JoinSet::new();

    // Polled on every loop iteration, so it has to stay put in memory
    // after the first poll. `tokio::pin!` pins it on the stack.
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Arms are checked top to bottom, so a pending signal stops the
            // accept loop even while connections are still queued.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let pipeline = Arc::clone(&pipeline);
                tasks.spawn(async move {
                    // Called once per request on the connection, not once
                    // per connection.
                    let svc = service_fn(move |req| service::dispatch(Arc::clone(&pipeline), req, peer));
                    // `auto::Builder` serves HTTP/1.1 or HTTP/2, whichever the
                    // client speaks. `TokioIo` adapts tokio's IO traits to hyper's.
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            // Reap finished connections so the set does not grow for the
            // lifetime of the process.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    // Drain: every in-flight connection finishes before main returns.
    while tasks.join_next().await.is_some() {}
    info!("demo stopped");
    Ok(())
}

async fn app(req: Request) -> Response {
    let path = req.path().to_owned();
    match path.as_str() {
        health::HEALTHCHECK_PATH => health::healthcheck(req).await,
        "/broken" => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
        p => match p.strip_prefix("/items/") {
            Some(id) if !id.is_empty() => {
                Response::json(format!(r#"{{"id":"{id}","name":"lamp"}}"#).into_bytes())
            }
            _ => Response::status(StatusCode::NOT_FOUND),
        },
    }
}

/// Resolves on the first shutdown signal: SIGTERM or SIGINT on Unix,
/// Ctrl-C elsewhere. A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // Never resolves, so only Ctrl-C can stop the demo off Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
