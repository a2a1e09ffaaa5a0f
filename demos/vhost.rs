//! Two sites on one port, routed by hostname.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example vhost
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://127.0.0.1:3000/users/42
//!   curl -H 'host: api.example.com' http://127.0.0.1:3000/users/42
//!   curl -H 'host: unknown.example' http://127.0.0.1:3000/

use regex::Regex;
use tsu_vhost::middleware::{Next, from_fn};
use tsu_vhost::{App, Method, Request, Response, Router, Rule, Server, Vhost, middleware, vhost};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let site = App::new()
        .with(from_fn(|req: Request, next: Next| async move {
            let mut res = next.run(req).await;
            res.set_header("x-powered-by", "tsu");
            res
        }))
        .with(Router::new().on(Method::GET, "/", home));

    let api = App::from(Router::new().on(Method::GET, "/users/{id}", get_user));

    let app = App::new()
        .with(middleware::trace())
        .with(vhost(Regex::new("(?i)localhost").expect("valid regex"), site))
        .with(Vhost::list([
            Rule::new("127.0.0.1", api.clone()),
            Rule::new(Regex::new(r"^api\.").expect("valid regex"), api),
        ]))
        .with(from_fn(|_req: Request, _next: Next| async { Response::text("no site here") }));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn home(_req: Request) -> Response {
    Response::text("Hello")
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}
