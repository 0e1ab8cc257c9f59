//! Transcript storage errors.

use thiserror::Error;

/// Errors that can occur while saving, loading or listing chats.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Chat not found: {name}")]
    NotFound { name: String },

    #[error("Invalid chat name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SessionError> for ai_types::AiError {
    fn from(e: SessionError) -> Self {
        ai_types::AiError::Session(e.to_string())
    }
}
