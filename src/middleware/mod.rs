//! Middleware layer.
//!
//! A middleware receives the request and a [`Next`] continuation. It may
//! short-circuit by returning a response without running `next`, or call
//! [`Next::run`] and post-process the response it gets back:
//!
//! ```rust
//! use tsu_vhost::{App, Request, Response};
//! use tsu_vhost::middleware::{Next, from_fn};
//!
//! let app = App::new()
//!     .with(from_fn(|req: Request, next: Next| async move {
//!         let mut res = next.run(req).await;
//!         res.set_header("x-powered-by", "tsu");
//!         res
//!     }))
//!     .with(from_fn(|_req: Request, _next: Next| async { Response::text("hello") }));
//! ```
//!
//! An [`App`](crate::App) is an ordered stack of middleware. [`Next::compose`]
//! runs one stack and then continues into an outer continuation, which is how
//! a [`Vhost`](crate::Vhost) mounts a whole application inside another one.

mod trace;

use std::future::Future;
use std::sync::Arc;

use http::StatusCode;

pub use crate::handler::BoxFuture;
pub use trace::{Trace, trace};

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Request-handling step in a chain.
///
/// Implement it directly for stateful middleware, or wrap an async closure
/// with [`from_fn`].
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An ordered, immutable middleware stack.
pub type Stack = Arc<[BoxedMiddleware]>;

/// The rest of the chain after the current middleware.
///
/// Consumed by [`run`](Self::run), so the remainder of the chain executes at
/// most once per request.
pub struct Next {
    stack: Stack,
    pos: usize,
    then: Then,
}

enum Then {
    Outer(Box<Next>),
    NotFound,
}

impl Next {
    /// Continuation that runs `stack` and answers `404 Not Found` when the
    /// last middleware calls through.
    pub(crate) fn new(stack: Stack) -> Self {
        Self { stack, pos: 0, then: Then::NotFound }
    }

    /// Runs `stack` in order, then continues into `outer`.
    pub fn compose(stack: Stack, outer: Next) -> Self {
        Self { stack, pos: 0, then: Then::Outer(Box::new(outer)) }
    }

    /// Runs the remainder of the chain.
    pub async fn run(self, req: Request) -> Response {
        self.step(req).await
    }

    fn step(self, req: Request) -> BoxFuture {
        let Next { stack, pos, then } = self;
        let current = stack.get(pos).cloned();
        match current {
            Some(mw) => mw.call(req, Next { stack, pos: pos + 1, then }),
            None => match then {
                Then::Outer(outer) => outer.step(req),
                Then::NotFound => Box::pin(async { Response::status(StatusCode::NOT_FOUND) }),
            },
        }
    }
}

/// Adapts an async closure `Fn(Request, Next) -> impl IntoResponse` into a
/// [`Middleware`].
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(f)
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}
