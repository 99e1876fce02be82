//! Handler trait and type erasure.
//!
//! # How the downstream handler is stored
//!
//! A [`Pipeline`](crate::Pipeline) ends in exactly one handler, but every
//! application's handler has its own concrete type. We hide it behind a
//! trait object (`dyn ErasedHandler`) so the pipeline and every [`Next`]
//! continuation can hold it uniformly, whatever middleware sits in front:
//!
//! ```text
//! async fn item(req: Request) -> Response { … }   ← user writes this
//!        ↓ Pipeline::new(item)
//! item.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(item))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  when the last Next runs      ← one vtable dispatch
//!        ↓
//! Box::pin(async { item(req).await.into_response() })  ← BoxFuture
//! ```
//!
//! Per request this costs one `Arc` clone (an atomic increment) when a
//! [`Next`] is built and one virtual call when it reaches the handler.
//!
//! [`Next`]: crate::middleware::Next

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Pin<Box<…>>` because the runtime polls the future in place and may not
/// move it after the first poll. `Send` lets tokio run it on any worker.
/// The lifetime lets middleware futures borrow the middleware itself; the
/// terminal handler always produces a `'static` one.
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = Response> + Send + 'a>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static>;
}

/// The handler shared by every in-flight request of a pipeline.
///
/// `Arc` gives shared, thread-safe ownership without copying the handler:
/// each [`Next`](crate::middleware::Next) holds a reference count, not a
/// clone of the closure.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid downstream handler.
///
/// Automatically satisfied by any `async fn` (or closure returning a
/// future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed through the private `Sealed` supertrait: only the
/// blanket impl below can satisfy it, so new bounds can be added without
/// breaking downstream crates.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// `Sealed` is unnameable outside this crate, so nothing else can
/// implement `Handler`.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

/// Any `Fn(Request) -> Fut`: named `async fn` items, closures returning an
/// `async` block, or a struct implementing `Fn`.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype bridging a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static> {
        // The concrete `Fut` is mapped to `Response` through `IntoResponse`
        // and boxed so every handler returns the same future type.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
