//! # tsu-vhost
//!
//! Virtual hosting for a minimal HTTP framework behind a reverse proxy: one
//! server, several applications, picked by the request's hostname.
//!
//! ## The pieces
//!
//! - [`App`] — an ordered middleware stack. Anything that can be mounted
//!   implements [`HandlerChain`].
//! - [`Router`] — radix-tree path routing via [`matchit`], usable as a
//!   middleware inside an `App`.
//! - [`Vhost`] — the host router. Matches the hostname against exact
//!   strings, regexes or an exact-key map and runs the selected app's stack
//!   in place. No match passes the request on.
//! - [`Server`] — hyper, HTTP/1.1 and HTTP/2, graceful shutdown on SIGTERM.
//! - [`config`] — the same routing described in TOML.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use regex::Regex;
//! use tsu_vhost::{App, Method, Request, Response, Router, Server, middleware, vhost};
//!
//! #[tokio::main]
//! async fn main() {
//!     let site = App::from(Router::new().on(Method::GET, "/", home));
//!     let admin = App::from(Router::new().on(Method::GET, "/", dashboard));
//!
//!     let app = App::new()
//!         .with(middleware::trace())
//!         .with(vhost(Regex::new(r"(?i)^(www\.)?example\.com$").unwrap(), site))
//!         .with(vhost("admin.example.com", admin));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn home(_req: Request) -> Response { Response::text("home") }
//! async fn dashboard(_req: Request) -> Response { Response::text("dashboard") }
//! ```

mod app;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod middleware;
pub mod vhost;

pub use app::{App, HandlerChain};
pub use config::{Apps, Config};
pub use error::{DispatchError, Error};
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use vhost::{Pattern, Rule, Vhost, vhost};
