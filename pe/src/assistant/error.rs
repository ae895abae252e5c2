//! Assistant service error types

use thiserror::Error;

/// Errors that can occur talking to the assistant service
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssistantError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            AssistantError::ApiError { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            AssistantError::Network(_) => true,
            AssistantError::InvalidResponse(_) => false,
            AssistantError::Json(_) => false,
        }
    }
}
