//! Hostname-based virtual hosting.
//!
//! A [`Vhost`] is a middleware that picks a target application by the
//! request's [`hostname`](crate::Request::hostname) and runs the target's
//! middleware stack in place of the rest of the host's chain. The target's
//! last middleware calling `next` continues into the host's chain, so a
//! mounted application behaves as if its middleware had been registered
//! inline. No match means the request passes straight through.
//!
//! Three shapes are supported, decided once at construction:
//!
//! ```rust
//! use regex::Regex;
//! use tsu_vhost::{App, Rule, Vhost, vhost};
//!
//! # let (admin, api, site) = (App::new(), App::new(), App::new());
//! // one condition, one target
//! let single = vhost(Regex::new("(?i)localhost").unwrap(), site.clone());
//!
//! // ordered rules, first match wins
//! let rules = Vhost::list([
//!     Rule::new("127.0.0.1", admin),
//!     Rule::new(Regex::new(r"^api\.").unwrap(), api),
//! ]);
//!
//! // exact hostname lookup, keys are never patterns
//! let map = Vhost::map([("example.com", site)]);
//! ```
//!
//! Targets are checked when a request matches, not at construction. A target
//! without a usable middleware stack, or one that panics while handling the
//! request, is answered with `500 Internal Server Error` carrying the
//! [`DispatchError`] message as body.

mod pattern;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

pub use pattern::Pattern;

use crate::app::HandlerChain;
use crate::error::DispatchError;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

type Target = Arc<dyn HandlerChain>;

/// A condition bound to the target it selects.
pub struct Rule {
    pattern: Pattern,
    target: Target,
}

impl Rule {
    pub fn new(pattern: impl Into<Pattern>, target: impl HandlerChain) -> Self {
        Self { pattern: pattern.into(), target: Arc::new(target) }
    }
}

enum Spec {
    Single(Rule),
    List(Vec<Rule>),
    Map(HashMap<String, Target>),
}

/// Host router middleware. See the [module docs](self).
///
/// Cloning is cheap and clones share the same rules. The rules never change
/// after construction, so one instance serves any number of concurrent
/// requests.
#[derive(Clone)]
pub struct Vhost {
    spec: Arc<Spec>,
}

/// Routes requests whose hostname matches `pattern` to `target`.
pub fn vhost(pattern: impl Into<Pattern>, target: impl HandlerChain) -> Vhost {
    Vhost::single(pattern, target)
}

impl Vhost {
    pub fn single(pattern: impl Into<Pattern>, target: impl HandlerChain) -> Self {
        Self::from_spec(Spec::Single(Rule::new(pattern, target)))
    }

    /// Rules are tried in order; the first matching rule wins.
    pub fn list(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self::from_spec(Spec::List(rules.into_iter().collect()))
    }

    /// Exact hostname to target lookup.
    pub fn map<K, T>(entries: impl IntoIterator<Item = (K, T)>) -> Self
    where
        K: Into<String>,
        T: HandlerChain,
    {
        let map = entries.into_iter()
            .map(|(host, target)| (host.into(), Arc::new(target) as Target))
            .collect();
        Self::from_spec(Spec::Map(map))
    }

    fn from_spec(spec: Spec) -> Self {
        Self { spec: Arc::new(spec) }
    }

    /// The target selected for `hostname`, if any.
    pub fn resolve(&self, hostname: &str) -> Option<&dyn HandlerChain> {
        let target = match &*self.spec {
            Spec::Single(rule) => rule.pattern.is_match(hostname).then_some(&rule.target),
            Spec::List(rules) => rules.iter()
                .find(|rule| rule.pattern.is_match(hostname))
                .map(|rule| &rule.target),
            Spec::Map(map) => map.get(hostname),
        };
        target.map(|t| &**t)
    }

    /// Routes one request.
    ///
    /// Without a match this is `next.run(req)`. With a match, the target's
    /// stack runs with `next` as its continuation. `Err` means the target
    /// could not serve the request; `next` has not been run by the router.
    pub async fn dispatch(&self, req: Request, next: Next) -> Result<Response, DispatchError> {
        let hostname = req.hostname().to_owned();

        let Some(target) = self.resolve(&hostname) else {
            debug!(%hostname, "no host rule matched");
            return Ok(next.run(req).await);
        };

        let Some(stack) = target.middleware() else {
            let err = DispatchError::InvalidTarget(hostname);
            error!(error = %err, "cannot dispatch to host target");
            return Err(err);
        };

        debug!(%hostname, "dispatching to host target");
        AssertUnwindSafe(Next::compose(stack, next).run(req))
            .catch_unwind()
            .await
            .map_err(|payload| {
                let err = DispatchError::from_panic(payload);
                error!(%hostname, error = %err, "host target failed");
                err
            })
    }
}

impl Middleware for Vhost {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let this = self.clone();
        Box::pin(async move {
            match this.dispatch(req, next).await {
                Ok(res) => res,
                Err(err) => err.into_response(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::StatusCode;
    use regex::Regex;

    use super::*;
    use crate::App;
    use crate::middleware::{BoxedMiddleware, Stack, from_fn};

    fn request(host: &str) -> Request {
        http::Request::builder()
            .uri("/")
            .header("host", host)
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    /// Sub-application answering `body` and tagging the response.
    fn site(body: &'static str, powered_by: &'static str) -> App {
        App::new()
            .with(from_fn(move |req: Request, next: Next| async move {
                let mut res = next.run(req).await;
                res.set_header("x-powered-by", powered_by);
                res
            }))
            .with(from_fn(move |_req: Request, _next: Next| async move { body }))
    }

    /// Host app: `router`, then a fallback that counts how often it runs.
    fn host(router: Vhost, reached: &Arc<AtomicUsize>) -> App {
        let reached = Arc::clone(reached);
        App::new()
            .with(router)
            .with(from_fn(move |_req: Request, _next: Next| {
                reached.fetch_add(1, Ordering::SeqCst);
                async { "fallback" }
            }))
    }

    fn resolves_to(router: &Vhost, hostname: &str, app: &App) -> bool {
        let expected = app.middleware().unwrap();
        router.resolve(hostname)
            .and_then(|t| t.middleware())
            .is_some_and(|got: Stack| Arc::ptr_eq(&got, &expected))
    }

    struct Unmountable;

    impl HandlerChain for Unmountable {
        fn middleware(&self) -> Option<Stack> { None }
    }

    #[test]
    fn exact_string_condition() {
        let b = site("World", "vhost");
        let router = vhost("127.0.0.1", b.clone());

        assert!(resolves_to(&router, "127.0.0.1", &b));
        assert!(router.resolve("127.0.0.2").is_none());
    }

    #[test]
    fn regex_condition() {
        let a = site("Hello", "tsu");
        let router = vhost(Regex::new("(?i)localhost").unwrap(), a.clone());

        for hostname in ["localhost", "LOCALHOST", "sub.localhost.com"] {
            assert!(resolves_to(&router, hostname, &a), "{hostname}");
        }
        assert!(router.resolve("127.0.0.1").is_none());
        assert!(router.resolve("").is_none());
    }

    #[test]
    fn first_matching_rule_wins() {
        let (t1, t2) = (site("one", "1"), site("two", "2"));
        let router = Vhost::list([
            Rule::new(Regex::new(r"^127\.").unwrap(), t1.clone()),
            Rule::new("127.0.0.1", t2.clone()),
        ]);

        assert!(resolves_to(&router, "127.0.0.1", &t1));
        assert!(!resolves_to(&router, "127.0.0.1", &t2));
    }

    #[test]
    fn later_rule_matches_when_earlier_does_not() {
        let (t1, t2) = (site("one", "1"), site("two", "2"));
        let router = Vhost::list([
            Rule::new("localhost", t1),
            Rule::new(Regex::new(r"^127\.0\.0\.1$").unwrap(), t2.clone()),
        ]);

        assert!(resolves_to(&router, "127.0.0.1", &t2));
    }

    #[test]
    fn map_keys_are_exact() {
        let t = site("mapped", "map");
        let router = Vhost::map([("127.0.0.1", t.clone()), (r"^local.*$", t.clone())]);

        assert!(resolves_to(&router, "127.0.0.1", &t));
        assert!(router.resolve("localhost").is_none());
        assert!(resolves_to(&router, r"^local.*$", &t));
    }

    #[tokio::test]
    async fn matched_target_serves_the_request() {
        let reached = Arc::new(AtomicUsize::new(0));
        let app = host(vhost(Regex::new("(?i)localhost").unwrap(), site("Hello", "tsu")), &reached);

        let res = app.call(request("localhost:2333")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello");
        assert_eq!(res.header("x-powered-by"), Some("tsu"));
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn target_calling_next_continues_into_host_chain() {
        let reached = Arc::new(AtomicUsize::new(0));
        let tagger = App::new().with(from_fn(|req: Request, next: Next| async move {
            let mut res = next.run(req).await;
            res.set_header("x-powered-by", "vhost");
            res
        }));
        let app = host(vhost("127.0.0.1", tagger), &reached);

        let res = app.call(request("127.0.0.1")).await;

        assert_eq!(res.body(), b"fallback");
        assert_eq!(res.header("x-powered-by"), Some("vhost"));
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_match_passes_through_once() {
        let reached = Arc::new(AtomicUsize::new(0));
        let app = host(vhost("127.0.0.1", site("wrong", "x")), &reached);

        let res = app.call(request("127.0.0.2")).await;

        assert_eq!(res.body(), b"fallback");
        assert_eq!(res.header("x-powered-by"), None);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmountable_target_is_500_without_next() {
        let reached = Arc::new(AtomicUsize::new(0));
        let app = host(vhost("127.0.0.1", Unmountable), &reached);

        let res = app.call(request("127.0.0.1")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            std::str::from_utf8(res.body()).unwrap(),
            "host `127.0.0.1` is bound to a target without a middleware stack",
        );
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_app_target_is_500() {
        let reached = Arc::new(AtomicUsize::new(0));
        let app = host(Vhost::map([("localhost", App::new())]), &reached);

        let res = app.call(request("localhost")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panicking_target_is_500_with_message() {
        let reached = Arc::new(AtomicUsize::new(0));
        let broken = App::new().with(from_fn(|_req: Request, _next: Next| async {
            if true {
                panic!("database unavailable");
            }
            "unreachable"
        }));
        let app = host(vhost("127.0.0.1", broken), &reached);

        let res = app.call(request("127.0.0.1")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"database unavailable");
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispatch_reports_error_without_rendering() {
        let router = vhost("127.0.0.1", Unmountable);
        let next = Next::new(Arc::from(Vec::<BoxedMiddleware>::new()));

        let err = router.dispatch(request("127.0.0.1"), next).await.unwrap_err();

        assert!(matches!(err, DispatchError::InvalidTarget(ref h) if h == "127.0.0.1"));
    }

    #[tokio::test]
    async fn malformed_specs_never_match() {
        let a = site("wrong", "x");
        let routers = [
            vhost(Pattern::Never, a.clone()),
            vhost(Pattern::regex("(bad"), a.clone()),
            Vhost::list(Vec::new()),
            Vhost::map(Vec::<(String, App)>::new()),
        ];

        for router in routers {
            for hostname in ["localhost", "127.0.0.1", ""] {
                let reached = Arc::new(AtomicUsize::new(0));
                let app = host(router.clone(), &reached);

                let res = app.call(request(hostname)).await;

                assert_eq!(res.body(), b"fallback");
                assert_eq!(reached.load(Ordering::SeqCst), 1);
            }
        }
    }

    #[tokio::test]
    async fn invalid_vhosts_do_not_shadow_a_valid_one() {
        let (wrong, right) = (site("wrong", "x"), site("right", "y"));
        let app = App::new()
            .with(Vhost::map([("nothing-here", wrong.clone())]))
            .with(vhost(Regex::new(r"^127\.0\.0\.\d+$").unwrap(), right))
            .with(Vhost::list(Vec::new()))
            .with(vhost("foobar", wrong));

        let res = app.call(request("127.0.0.1:2333")).await;
        assert_eq!(res.body(), b"right");

        let res = app.call(request("localhost:2333")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn identical_construction_identical_behaviour() {
        let t = site("same", "s");
        let build = || Vhost::list([Rule::new(Regex::new("^a").unwrap(), t.clone())]);
        let (first, second) = (build(), build());

        for _ in 0..3 {
            for hostname in ["a.example", "b.example"] {
                assert_eq!(resolves_to(&first, hostname, &t), resolves_to(&second, hostname, &t));
            }
        }

        let app = App::new().with(first);
        for _ in 0..3 {
            assert_eq!(app.call(request("a.example")).await.body(), b"same");
        }
    }
}
