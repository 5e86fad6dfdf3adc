use thiserror::Error;

/// Domain failures reported back to the caller of a store operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("message text cannot be empty")]
    EmptyText,

    #[error("message too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("message not found: {0}")]
    MessageNotFound(String),

    #[error("Rate limit exceeded. Maximum {limit} messages per {window_secs} seconds.")]
    RateLimitExceeded { limit: u32, window_secs: u64 },
}

impl ChatError {
    /// Validation failures are answered with an error event to the submitter
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::EmptyText | ChatError::TooLong { .. })
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
