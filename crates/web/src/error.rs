use http::StatusCode;
use http::header::InvalidHeaderValue;
use std::io;
use thiserror::Error;

/// Errors surfaced while registering routes, before any request is served.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("unknown http method: {method}")]
    UnknownMethod { method: String },

    #[error("at least one http method is required")]
    EmptyMethods,

    #[error("invalid route path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("route '{path}' declares {count} params, exceed the limit {max}")]
    TooManyParams { path: String, count: usize, max: usize },

    #[error("route '{path}' rejected by matcher: {source}")]
    Insert {
        path: String,
        #[source]
        source: matchit::InsertError,
    },
}

impl RegisterError {
    pub fn unknown_method<S: ToString>(method: S) -> Self {
        Self::UnknownMethod { method: method.to_string() }
    }

    pub fn invalid_path<P: ToString, R: ToString>(path: P, reason: R) -> Self {
        Self::InvalidPath { path: path.to_string(), reason: reason.to_string() }
    }
}

/// Errors returned by handlers while a request is being served.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid header value: {source}")]
    Header {
        #[from]
        source: InvalidHeaderValue,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("handler error: {source}")]
    Handler {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub fn new<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Status { status, message: message.to_string() }
    }

    pub fn not_found<S: ToString>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    pub fn not_implemented() -> Self {
        Self::new(StatusCode::NOT_IMPLEMENTED, "Not Implemented")
    }

    pub fn bad_request<S: ToString>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal<S: ToString>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    pub fn handler<E: Into<Box<dyn std::error::Error + Send + Sync>>>(e: E) -> Self {
        Self::Handler { source: e.into() }
    }

    /// The response status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Status { status, .. } => *status,
            Error::Json { .. } | Error::Header { .. } | Error::Io { .. } | Error::Handler { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
