//! # Error and Result Type

use std::error;
use std::fmt;

/// A result type that uses [`AuthError`] as an error type
pub type Result<T> = std::result::Result<T, AuthError>;

/// Terminal status of an authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Input validation failed before any exchange was attempted.
    BadRequest,
    /// The identity provider answered with a non-2xx status code.
    OauthServerError,
    /// The exchange failed below the HTTP layer.
    NetworkError,
    /// The response body was not JSON, or lacked required fields.
    BadResponse,
    /// The user dismissed the enrollment overlay.
    UserCancelled,
    /// Local cache or store failure, or an impossible code path.
    InternalError,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Status::BadRequest => "BAD_REQUEST",
            Status::OauthServerError => "OAUTH_SERVER_ERROR",
            Status::NetworkError => "NETWORK_ERROR",
            Status::BadResponse => "BAD_RESPONSE",
            Status::UserCancelled => "USER_CANCELLED",
            Status::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", name)
    }
}

/// The main error type used throughout this crate. Every failure carries the
/// [`Status`] surfaced to callers plus a context message. Token values are
/// never placed in messages.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub status: Status,
    pub message: String,
}

impl AuthError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        AuthError {
            status,
            message: message.into(),
        }
    }

    /// Prepends flow context to the message, keeping the status unchanged.
    pub fn context(mut self, context: &str) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl error::Error for AuthError {}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        AuthError::new(Status::NetworkError, error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        AuthError::new(Status::BadResponse, error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        AuthError::new(Status::InternalError, error.to_string())
    }
}
