//! Error types for calendar and identity provider operations.
//!
//! [`ProviderError`] covers every failed call to the remote calendar: it
//! carries a category, the HTTP status and the response body when there was
//! one. [`AuthError`] covers the credential lifecycle.

use std::fmt;
use std::io;

use thiserror::Error;

/// The category of a provider error.
///
/// Used for retry decisions and for the per-exam report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Authentication failed or credentials are invalid/expired (401).
    AuthenticationFailed,
    /// Authorization failed - the token lacks permission (403).
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded (429).
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (other 4xx) - bad parameters, malformed body.
    BadRequest,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// The server answered with a success status other than the expected one.
    UnexpectedStatus,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError)
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::UnexpectedStatus => "unexpected_status",
            Self::InternalError => "internal_error",
        }
    }

    /// Classifies an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            403 => Self::AuthorizationFailed,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            400..=499 => Self::BadRequest,
            500..=599 => Self::ServerError,
            _ => Self::UnexpectedStatus,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to the remote calendar.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// HTTP status of the failed response, if the server answered.
    status: Option<u16>,
    /// Response body of the failed response, if any.
    body: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            body: None,
            source: None,
        }
    }

    /// Creates an error from a non-success HTTP response.
    pub fn from_response(status: u16, body: impl Into<String>, context: impl Into<String>) -> Self {
        let mut err = Self::new(ProviderErrorCode::from_status(status), context);
        err.status = Some(status);
        err.body = Some(body.into());
        err
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the response body, if the server answered.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true if the server answered that it did not act on the
    /// request (HTTP 429 or 503), so repeating a non-idempotent call is safe.
    pub fn is_unprocessed(&self) -> bool {
        matches!(self.status, Some(429 | 503))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {})", status)?;
        }
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            write!(f, ": {}", body.trim())?;
        }
        Ok(())
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the credential lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The store holds neither an access token nor a refresh token.
    #[error("no usable credential at {path}; run the authorization flow first")]
    NoCredential { path: String },

    /// The access token expired and there is no refresh token.
    #[error("stored access token expired and no refresh token is available")]
    Expired,

    /// The identity provider rejected the refresh.
    #[error("token refresh failed: {0}")]
    Refresh(#[source] ProviderError),

    /// The refreshed credential could not be written.
    #[error("failed to persist credential to {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A specialized Result type for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;
