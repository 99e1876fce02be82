//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request as seen by middleware and handlers.
///
/// The remote address is an opaque string supplied by the host: the hyper
/// adapter fills it with the peer `SocketAddr`, tests may pass a bare IP.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: String,
}

impl Request {
    /// Wraps an `http::Request` whose body has already been collected.
    pub fn new(req: http::Request<Bytes>, remote_addr: impl Into<String>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body, remote_addr)
    }

    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: impl Into<String>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr: remote_addr.into(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> &str { &self.remote_addr }

    /// Path plus query string, exactly as requested (`/items/42?full=1`).
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("/")
    }

    /// Case-insensitive header lookup.
    ///
    /// Values that are not valid visible ASCII are skipped; use
    /// [`headers`](Self::headers) for raw bytes.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
