//! Engine error types.

use examsync_providers::ProviderError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a whole sync run.
///
/// Failures of a single create or update never surface here; they end up
/// in that exam's report entry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Listing the remote calendar failed, so no index could be built.
    #[error("failed to list remote events: {0}")]
    Listing(#[source] ProviderError),

    /// Invalid engine configuration.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl EngineError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
