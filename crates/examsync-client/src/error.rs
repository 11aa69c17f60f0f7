//! Client error types.

use std::fmt;

use examsync_engine::EngineError;
use examsync_providers::{AuthError, ProviderError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// The exam input could not be read or parsed.
    Input(String),
    /// IO error.
    Io(std::io::Error),
    /// No usable credential.
    Auth(AuthError),
    /// Remote calendar error outside of a sync run.
    Provider(ProviderError),
    /// The sync run aborted.
    Engine(EngineError),
    /// The run completed but some exams failed.
    SyncFailed { failed: usize },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Input(msg) => write!(f, "invalid input: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Auth(err) => write!(f, "authentication required: {}", err),
            Self::Provider(err) => write!(f, "calendar error: {}", err),
            Self::Engine(err) => write!(f, "sync aborted: {}", err),
            Self::SyncFailed { failed: 1 } => write!(f, "1 exam failed to sync"),
            Self::SyncFailed { failed } => write!(f, "{} exams failed to sync", failed),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Auth(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

impl From<EngineError> for ClientError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_count_is_pluralized() {
        assert_eq!(
            ClientError::SyncFailed { failed: 1 }.to_string(),
            "1 exam failed to sync"
        );
        assert_eq!(
            ClientError::SyncFailed { failed: 3 }.to_string(),
            "3 exams failed to sync"
        );
    }

    #[test]
    fn auth_error_keeps_source() {
        let err = ClientError::from(AuthError::Expired);
        assert!(err.to_string().starts_with("authentication required"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
