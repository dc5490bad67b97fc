//! Core error types.

use std::fmt;

/// Core errors for request/response handling.
#[derive(Debug)]
pub enum Error {
    /// Request body could not be parsed.
    MalformedBody(String),

    /// Request body exceeded the configured limit.
    BodyTooLarge { limit: usize },

    /// `send` was called on a responder that already sent.
    AlreadySent,

    /// A handler returned without producing a terminal write.
    NoResponse,

    /// Template rendering failed.
    Template(tera::Error),

    /// JSON encoding failed.
    Json(serde_json::Error),

    /// HTTP message construction failed.
    Http(http::Error),

    /// Database error.
    Database(sqlx::Error),

    /// Custom error with message.
    Custom(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedBody(msg) => write!(f, "malformed request body: {}", msg),
            Error::BodyTooLarge { limit } => {
                write!(f, "request body exceeds limit of {} bytes", limit)
            }
            Error::AlreadySent => write!(f, "response was already sent"),
            Error::NoResponse => write!(f, "handler produced no response"),
            Error::Template(e) => write!(f, "template error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Database(e) => write!(f, "database error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Error::Template(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e)
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Custom(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Custom(msg.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
