//! Dispatch errors.

use thiserror::Error;

/// Why an AI action did not produce a completion.
///
/// Every variant is terminal for its invocation; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Text field is empty. Write something first.")]
    EmptyInput,

    #[error("You've used all your AI actions. Please upgrade your plan.")]
    QuotaExhausted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to update AI usage count: {0}")]
    Persist(String),

    #[error("Error processing AI action: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Session rejected: {0}")]
    Unauthorized(String),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("AI action cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Whether the server is known to have rejected the request before
    /// spending a credit.
    pub fn rejected_before_debit(&self) -> bool {
        matches!(
            self,
            DispatchError::InvalidInput(_) | DispatchError::Persist(_) | DispatchError::Unauthorized(_)
        )
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        DispatchError::Transport(e.to_string())
    }
}
