//! Error types for the query pipeline.

use admit_core::error::AdmitError;

use crate::state_machine::ComposerState;

/// Errors from the chat engine.
///
/// None of these reach the end user; the composer turns them into a
/// fallback reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid composer transition from {0} to {1}")]
    InvalidTransition(ComposerState, ComposerState),
    #[error("session store lock poisoned: {0}")]
    LockPoisoned(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
}

impl From<ChatError> for AdmitError {
    fn from(err: ChatError) -> Self {
        AdmitError::Session(err.to_string())
    }
}

/// Why a generation attempt produced no usable text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out after {0}s")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited by completion service")]
    RateLimited,
    #[error("completion service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed completion response: {0}")]
    Malformed(String),
    #[error("completion service returned no text")]
    Empty,
    #[error("generation unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Timeout(_)
            | GenerationError::Transport(_)
            | GenerationError::RateLimited => true,
            GenerationError::Rejected { status, .. } => *status >= 500,
            GenerationError::Malformed(_)
            | GenerationError::Empty
            | GenerationError::Unavailable(_) => false,
        }
    }
}

impl From<GenerationError> for AdmitError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::RateLimited => AdmitError::RateLimited,
            other => AdmitError::Generation(other.to_string()),
        }
    }
}
