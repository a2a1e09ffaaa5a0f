//! Error types.

use http::StatusCode;
use thiserror::Error;

use crate::response::{IntoResponse, Response};

/// The error type returned by tsu's fallible infrastructure operations.
///
/// Application-level errors (404, 500, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup failures: reading configuration, binding a port, accepting a
/// connection.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),
}

/// Why a [`Vhost`](crate::Vhost) could not serve a request it matched.
///
/// Rendered as `500 Internal Server Error` with [`Display`](std::fmt::Display)
/// output as the body. The router does not tell a target that cannot be
/// mounted apart from one that failed while handling the request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The hostname matched, but the bound target exposes no middleware stack.
    #[error("host `{0}` is bound to a target without a middleware stack")]
    InvalidTarget(String),

    /// The target's middleware chain panicked.
    #[error("{0}")]
    Panicked(String),
}

impl DispatchError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(s) => (*s).to_owned(),
                Err(_) => "middleware panicked".to_owned(),
            },
        };
        Self::Panicked(message)
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text(self.to_string())
    }
}
