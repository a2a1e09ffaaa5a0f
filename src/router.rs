//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. A `Router` is itself a
//! middleware: a matched route is answered by its handler, anything else
//! falls through to the next middleware.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::request::Request;

/// The path router.
///
/// Build it once at startup, then mount it on an [`App`](crate::App).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use tsu_vhost::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` conflicts with an already registered route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Middleware for Router {
    fn call(&self, mut req: Request, next: Next) -> BoxFuture {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req)
            }
            None => Box::pin(next.run(req)),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::{App, Response};

    fn request(method: Method, path: &str) -> Request {
        http::Request::builder().method(method).uri(path).body(Bytes::new()).unwrap().into()
    }

    async fn get_user(req: Request) -> Response {
        Response::text(format!("user {}", req.param("id").unwrap_or("?")))
    }

    #[tokio::test]
    async fn matched_route_sets_params() {
        let app = App::from(Router::new().on(Method::GET, "/users/{id}", get_user));

        let res = app.call(request(Method::GET, "/users/42")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"user 42");
    }

    #[tokio::test]
    async fn unmatched_method_or_path_falls_through() {
        let app = App::new()
            .with(Router::new().on(Method::GET, "/users/{id}", get_user))
            .with(crate::middleware::from_fn(|_req: Request, _next: Next| async { "fallback" }));

        let res = app.call(request(Method::DELETE, "/users/42")).await;
        assert_eq!(res.body(), b"fallback");

        let res = app.call(request(Method::GET, "/teams/1")).await;
        assert_eq!(res.body(), b"fallback");
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_route_panics() {
        let _ = Router::new()
            .on(Method::GET, "/users/{id}", get_user)
            .on(Method::GET, "/users/{name}", get_user);
    }
}
