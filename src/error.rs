//! Error types
//!
//! Request-level errors are turned into HTTP statuses by the pipeline.
//! Startup errors are fatal: the process refuses to start.

use hyper::Method;
use std::path::PathBuf;

/// Errors raised while validating an incoming request
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Anything other than `GET` (surfaced as 405)
    #[error("method not allowed: {0}")]
    UnsupportedMethod(Method),

    /// Path that cannot be percent-decoded into a usable string (surfaced as 400)
    #[error("malformed request path: {0}")]
    MalformedPath(String),
}

impl RequestError {
    /// HTTP status code this error is reported as
    pub const fn status(&self) -> u16 {
        match self {
            Self::UnsupportedMethod(_) => 405,
            Self::MalformedPath(_) => 400,
        }
    }
}

/// Errors that abort process startup
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid listen port: {0}")]
    InvalidPort(u16),

    #[error("web root '{}' is not usable: {reason}", path.display())]
    WebRoot { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
