//! Applications: ordered middleware stacks.

use std::sync::Arc;

use crate::middleware::{BoxedMiddleware, Middleware, Next, Stack};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Something that can be mounted as a request target.
///
/// A value is mountable when it exposes a non-empty, ordered middleware
/// stack. [`Vhost`](crate::Vhost) checks this at request time: `None` turns a
/// matched request into a `500`.
pub trait HandlerChain: Send + Sync + 'static {
    fn middleware(&self) -> Option<Stack>;
}

impl<T: HandlerChain + ?Sized> HandlerChain for Arc<T> {
    fn middleware(&self) -> Option<Stack> {
        (**self).middleware()
    }
}

/// An application: middleware run in registration order.
///
/// Cloning is cheap; clones share the same stack.
///
/// ```rust
/// use tsu_vhost::{App, Method, Request, Response, Router, middleware};
///
/// async fn hello(_req: Request) -> Response { Response::text("hello") }
///
/// let app = App::new()
///     .with(middleware::trace())
///     .with(Router::new().on(Method::GET, "/", hello));
/// ```
#[derive(Clone)]
pub struct App {
    stack: Stack,
}

impl App {
    pub fn new() -> Self {
        Self { stack: Arc::from(Vec::<BoxedMiddleware>::new()) }
    }

    /// Appends a middleware. Returns `self` for chaining.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        let mut stack = self.stack.to_vec();
        stack.push(Arc::new(middleware));
        self.stack = stack.into();
        self
    }

    pub fn len(&self) -> usize { self.stack.len() }
    pub fn is_empty(&self) -> bool { self.stack.is_empty() }

    /// Runs `req` through the stack. Falling off the end answers `404 Not Found`.
    pub async fn call(&self, req: Request) -> Response {
        Next::new(Arc::clone(&self.stack)).run(req).await
    }
}

impl Default for App {
    fn default() -> Self { Self::new() }
}

impl From<Router> for App {
    fn from(router: Router) -> Self {
        Self::new().with(router)
    }
}

impl HandlerChain for App {
    fn middleware(&self) -> Option<Stack> {
        (!self.stack.is_empty()).then(|| Arc::clone(&self.stack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;

    #[test]
    fn empty_app_is_not_mountable() {
        assert!(App::new().middleware().is_none());
        let app = App::new().with(from_fn(|_req: Request, _next: Next| async { "hi" }));
        assert_eq!(app.middleware().map(|s| s.len()), Some(1));
        assert_eq!(Arc::new(app).middleware().map(|s| s.len()), Some(1));
    }

    #[test]
    fn clones_share_the_stack() {
        let app = App::new().with(from_fn(|_req: Request, _next: Next| async { "hi" }));
        let copy = app.clone();
        let (a, b) = (app.middleware().unwrap(), copy.middleware().unwrap());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
