//! Crate-local error type.

use thiserror::Error;

/// Errors raised by chat model and embedder implementations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The underlying HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider responded, but with a non-success status or malformed body.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// A rate limit was hit; callers may retry after backing off.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed; retrying with the same credentials will not help.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request itself was invalid (empty messages, bad config, etc).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The provider is not reachable or not configured.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl LlmError {
    /// Whether a retry is worth attempting (network blips, rate limits),
    /// as opposed to an error retrying won't fix (auth, validation).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::RateLimited(_) | LlmError::Unavailable(_)
        )
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, LlmError>;
