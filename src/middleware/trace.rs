//! Per-request tracing.

use std::time::Instant;

use tracing::info;

use super::{BoxFuture, Middleware, Next};
use crate::request::Request;

/// Logs method, path, hostname, status and latency once per request.
///
/// Register it first so the latency covers the whole chain:
///
/// ```rust
/// use tsu_vhost::{App, middleware};
///
/// let app = App::new().with(middleware::trace());
/// ```
pub fn trace() -> Trace {
    Trace
}

/// Middleware returned by [`trace`].
pub struct Trace;

impl Middleware for Trace {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let method = req.method().clone();
        let path = req.path().to_owned();
        let host = req.hostname().to_owned();

        Box::pin(async move {
            let started = Instant::now();
            let res = next.run(req).await;
            info!(
                %method,
                %path,
                %host,
                status = res.status_code().as_u16(),
                latency_us = started.elapsed().as_micros() as u64,
                "request"
            );
            res
        })
    }
}
