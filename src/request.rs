//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, request::Parts};

/// An incoming HTTP request.
///
/// The request is owned and moved down the middleware chain: each middleware
/// receives it, and hands it on through [`Next::run`](crate::middleware::Next::run).
pub struct Request {
    pub(crate) head: Parts,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) trust_proxy: bool,
}

impl Request {
    pub(crate) fn new(head: Parts, body: Bytes, trust_proxy: bool) -> Self {
        Self { head, body, params: HashMap::new(), trust_proxy }
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The host the client asked for, port included.
    ///
    /// Behind a trusted proxy the first `X-Forwarded-Host` value wins. Then
    /// the `Host` header, then the URI authority (HTTP/2 `:authority`).
    /// Empty when none is present.
    pub fn host(&self) -> &str {
        let forwarded = if self.trust_proxy {
            self.header("x-forwarded-host")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|h| !h.is_empty())
        } else {
            None
        };

        forwarded
            .or_else(|| self.header("host"))
            .or_else(|| self.head.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// [`host`](Self::host) without the port.
    ///
    /// IPv6 literals keep their brackets: `[::1]:3000` gives `[::1]`.
    pub fn hostname(&self) -> &str {
        let host = self.host();
        if host.starts_with('[') {
            return host.find(']').map_or(host, |end| &host[..=end]);
        }
        host.split_once(':').map_or(host, |(name, _port)| name)
    }
}

/// Builds a request from an in-memory [`http::Request`], e.g. in tests or
/// when driving an [`App`](crate::App) without a socket.
impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (head, body) = req.into_parts();
        Self::new(head, body.into(), false)
    }
}
